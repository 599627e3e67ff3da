use std::path::PathBuf;

use chrono::Utc;

use crate::error::{AppError, Result};
use crate::models::{Session, User};
use crate::services::AuthClient;

const REFRESH_MARGIN_SECS: i64 = 60;

/// Owns the signed-in session and keeps a copy on disk between runs.
pub struct SessionProvider {
    auth: AuthClient,
    session: Option<Session>,
    store_path: Option<PathBuf>,
}

impl SessionProvider {
    pub fn new(auth: AuthClient, store_path: Option<PathBuf>) -> Self {
        Self {
            auth,
            session: None,
            store_path,
        }
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn access_token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.access_token.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// Load the cached session, refreshing it if the access token expired
    /// or is about to.
    pub async fn restore(&mut self) -> Result<()> {
        let Some(path) = &self.store_path else {
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }

        let content = std::fs::read_to_string(path)?;
        let session: Session = match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Discarding unreadable session cache: {}", e);
                self.clear_store();
                return Ok(());
            }
        };

        self.session = Some(session);
        if let Err(e) = self.ensure_fresh().await {
            tracing::warn!("Session refresh failed, signing out locally: {}", e);
        }
        Ok(())
    }

    /// Renew the access token once it is within the refresh margin of its
    /// expiry. A session that cannot be renewed is dropped and the error returned.
    pub async fn ensure_fresh(&mut self) -> Result<()> {
        let Some(session) = &self.session else {
            return Ok(());
        };
        if !session.expires_within(Utc::now(), REFRESH_MARGIN_SECS) {
            return Ok(());
        }
        let Some(refresh_token) = session.refresh_token.clone() else {
            self.session = None;
            self.clear_store();
            return Err(AppError::NotAuthenticated);
        };

        match self.auth.refresh(&refresh_token).await {
            Ok(fresh) => {
                tracing::info!("Refreshed session for {}", fresh.user.id);
                self.set_session(fresh)
            }
            Err(e) => {
                self.session = None;
                self.clear_store();
                Err(e)
            }
        }
    }

    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<&User> {
        let session = self
            .auth
            .sign_in_with_password(email.trim(), password)
            .await?;
        tracing::info!("Signed in as {}", session.user.id);
        self.set_session(session)?;
        self.current_user().ok_or(AppError::NotAuthenticated)
    }

    /// Register a new account. Returns whether a session was issued right away.
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Result<bool> {
        match self.auth.sign_up(email.trim(), password).await? {
            Some(session) => {
                tracing::info!("Registered and signed in as {}", session.user.id);
                self.set_session(session)?;
                Ok(true)
            }
            None => {
                tracing::info!("Registered {}, awaiting email confirmation", email.trim());
                Ok(false)
            }
        }
    }

    /// The local session is dropped even when the remote call fails.
    pub async fn sign_out(&mut self) -> Result<()> {
        let session = self.session.take();
        self.clear_store();

        if let Some(session) = session {
            self.auth.sign_out(&session.access_token).await?;
            tracing::info!("Signed out {}", session.user.id);
        }
        Ok(())
    }

    fn set_session(&mut self, session: Session) -> Result<()> {
        if let Some(path) = &self.store_path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&session)?)?;
        }
        self.session = Some(session);
        Ok(())
    }

    fn clear_store(&self) {
        if let Some(path) = &self.store_path {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    tracing::warn!("Failed to remove session cache {:?}: {}", path, e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn session_json(expires_at: i64) -> serde_json::Value {
        serde_json::json!({
            "access_token": "jwt",
            "refresh_token": "refresh",
            "expires_at": expires_at,
            "user": {"id": "u1", "email": "aluno@example.com"}
        })
    }

    fn cached(expires_at: i64) -> Session {
        serde_json::from_value(session_json(expires_at)).unwrap()
    }

    fn provider(server: &MockServer, store: Option<PathBuf>) -> SessionProvider {
        let auth = AuthClient::new(&server.uri(), "anon", Duration::from_secs(5)).unwrap();
        SessionProvider::new(auth, store)
    }

    #[tokio::test]
    async fn sign_in_persists_and_restore_reloads() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("session.json");
        let future = Utc::now().timestamp() + 3600;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(future)))
            .mount(&server)
            .await;

        let mut first = provider(&server, Some(store.clone()));
        let user = first.sign_in("aluno@example.com", "segredo").await.unwrap();
        assert_eq!(user.id, "u1");
        assert!(store.exists());

        let mut second = provider(&server, Some(store.clone()));
        assert!(!second.is_authenticated());
        second.restore().await.unwrap();
        assert_eq!(second.access_token(), Some("jwt"));
    }

    #[tokio::test]
    async fn expired_cache_is_refreshed() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("session.json");
        std::fs::write(&store, session_json(1).to_string()).unwrap();

        let mut fresh = session_json(Utc::now().timestamp() + 3600);
        fresh["access_token"] = serde_json::json!("jwt-2");
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fresh))
            .expect(1)
            .mount(&server)
            .await;

        let mut provider = provider(&server, Some(store));
        provider.restore().await.unwrap();
        assert_eq!(provider.access_token(), Some("jwt-2"));
    }

    #[tokio::test]
    async fn token_close_to_expiry_is_renewed_on_demand() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("session.json");

        let mut fresh = session_json(Utc::now().timestamp() + 3600);
        fresh["access_token"] = serde_json::json!("jwt-2");
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fresh))
            .expect(1)
            .mount(&server)
            .await;

        let mut provider = provider(&server, Some(store.clone()));
        provider.session = Some(cached(Utc::now().timestamp() + 3600));
        provider.ensure_fresh().await.unwrap();
        assert_eq!(provider.access_token(), Some("jwt"));

        provider.session = Some(cached(Utc::now().timestamp() + 10));
        provider.ensure_fresh().await.unwrap();
        assert_eq!(provider.access_token(), Some("jwt-2"));
        assert!(store.exists());
    }

    #[tokio::test]
    async fn failed_renewal_drops_the_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "refresh_token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error_code": "refresh_token_not_found",
                "msg": "Invalid Refresh Token: Refresh Token Not Found"
            })))
            .mount(&server)
            .await;

        let mut provider = provider(&server, None);
        provider.session = Some(cached(1));
        assert!(provider.ensure_fresh().await.is_err());
        assert!(!provider.is_authenticated());
    }

    #[tokio::test]
    async fn failed_remote_sign_out_still_clears_session() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("session.json");
        let future = Utc::now().timestamp() + 3600;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(session_json(future)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let mut provider = provider(&server, Some(store.clone()));
        provider.sign_in("aluno@example.com", "segredo").await.unwrap();

        assert!(provider.sign_out().await.is_err());
        assert!(!provider.is_authenticated());
        assert!(!store.exists());
    }
}
