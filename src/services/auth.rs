use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, AuthError, Result};
use crate::models::Session;

use super::{build_http_client, parse_base_url};

const AUTH_PATH: &str = "auth/v1/";
const INVALID_CREDENTIALS: &str = "Invalid login credentials";
const EMAIL_NOT_CONFIRMED: &str = "email_not_confirmed";

#[derive(Debug, Serialize)]
struct PasswordCredentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

// The auth service has used several error shapes over time.
#[derive(Debug, Default, Deserialize)]
struct AuthErrorBody {
    error: Option<String>,
    error_description: Option<String>,
    error_code: Option<String>,
    msg: Option<String>,
    message: Option<String>,
}

impl AuthErrorBody {
    fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.error_description.as_deref())
            .or(self.message.as_deref())
            .or(self.error.as_deref())
    }
}

/// Client for the hosted auth API.
pub struct AuthClient {
    client: Client,
    base_url: Url,
    anon_key: String,
}

impl AuthClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: parse_base_url(base_url)?,
            anon_key: anon_key.to_string(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(AUTH_PATH)?.join(path)?)
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("token")?)
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let session = check(response).await?.json().await?;
        Ok(session)
    }

    /// Create an account. Returns `None` when the project requires email
    /// confirmation before a session is issued.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>> {
        let response = self
            .client
            .post(self.endpoint("signup")?)
            .header("apikey", &self.anon_key)
            .json(&PasswordCredentials { email, password })
            .send()
            .await?;
        let body: serde_json::Value = check(response).await?.json().await?;
        if body.get("access_token").is_some() {
            Ok(Some(serde_json::from_value(body)?))
        } else if body.get("id").is_some() || body.get("user").is_some() {
            Ok(None)
        } else {
            Err(anyhow::anyhow!("Unexpected sign-up response: {}", body).into())
        }
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<Session> {
        let response = self
            .client
            .post(self.endpoint("token")?)
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let session = check(response).await?.json().await?;
        Ok(session)
    }

    pub async fn sign_out(&self, access_token: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("logout")?)
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(&body).into())
}

fn classify_error(body: &str) -> AuthError {
    let error: AuthErrorBody = serde_json::from_str(body).unwrap_or_default();
    let text = error.text().unwrap_or(body).trim().to_string();

    if text.contains(INVALID_CREDENTIALS) || error.error_code.as_deref() == Some("invalid_credentials") {
        return AuthError::InvalidCredentials;
    }
    if error.error_code.as_deref() == Some(EMAIL_NOT_CONFIRMED)
        || text.contains(EMAIL_NOT_CONFIRMED)
        || text.eq_ignore_ascii_case("Email not confirmed")
    {
        return AuthError::EmailNotConfirmed;
    }
    AuthError::Other(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> AuthClient {
        AuthClient::new(&server.uri(), "anon-key", Duration::from_secs(5)).unwrap()
    }

    fn session_body() -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "expires_at": 4102444800i64,
            "refresh_token": "refresh",
            "user": {"id": "u1", "email": "aluno@example.com", "aud": "authenticated"}
        })
    }

    #[tokio::test]
    async fn password_sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon-key"))
            .and(body_json(serde_json::json!({
                "email": "aluno@example.com",
                "password": "segredo"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_body()))
            .mount(&server)
            .await;

        let session = client(&server)
            .sign_in_with_password("aluno@example.com", "segredo")
            .await
            .unwrap();
        assert_eq!(session.access_token, "jwt");
        assert_eq!(session.user.id, "u1");
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let err = client(&server)
            .sign_in_with_password("aluno@example.com", "errada")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn signup_without_session_awaits_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "u2",
                "email": "novo@example.com",
                "confirmation_sent_at": "2024-03-01T12:00:00Z"
            })))
            .mount(&server)
            .await;

        let session = client(&server)
            .sign_up("novo@example.com", "segredo")
            .await
            .unwrap();
        assert!(session.is_none());
    }

    #[tokio::test]
    async fn logout_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .and(header("Authorization", "Bearer jwt"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server).sign_out("jwt").await.unwrap();
    }

    #[test]
    fn error_shapes_are_classified() {
        assert_eq!(
            classify_error(r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#),
            AuthError::EmailNotConfirmed
        );
        assert_eq!(
            classify_error(r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            classify_error(r#"{"msg":"Signups not allowed for this instance"}"#),
            AuthError::Other("Signups not allowed for this instance".to_string())
        );
        assert_eq!(classify_error("gateway timeout"), AuthError::Other("gateway timeout".to_string()));
    }
}
