use std::time::Duration;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

use super::{build_http_client, parse_base_url};

const REST_PATH: &str = "rest/v1/";
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
const NO_ROWS_CODE: &str = "PGRST116";
const CHECK_VIOLATION_CODE: &str = "23514";

/// Server-side checks the client knows how to name.
const KNOWN_CONSTRAINTS: [&str; 2] = ["subjects_limit", "topics_limit"];

#[derive(Debug, Default, Deserialize)]
struct PostgrestError {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

/// A filtered read against one table.
#[derive(Debug, Clone)]
pub struct Query {
    table: &'static str,
    select: String,
    filters: Vec<(String, String)>,
    order: Option<String>,
}

impl Query {
    pub fn table(table: &'static str) -> Self {
        Self {
            table,
            select: "*".to_string(),
            filters: Vec::new(),
            order: None,
        }
    }

    /// Column list, including embedded relations such as `*,topics(*)`.
    pub fn select(mut self, columns: &str) -> Self {
        self.select = columns.to_string();
        self
    }

    pub fn eq(mut self, column: &str, value: &str) -> Self {
        self.filters.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.order = Some(format!("{column}.{direction}"));
        self
    }

    fn params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), self.select.clone())];
        params.extend(self.filters.iter().cloned());
        if let Some(order) = &self.order {
            params.push(("order".to_string(), order.clone()));
        }
        params
    }
}

/// Client for the table query API.
pub struct RestClient {
    client: Client,
    base_url: Url,
    anon_key: String,
    access_token: Option<String>,
}

impl RestClient {
    pub fn new(base_url: &str, anon_key: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: build_http_client(timeout)?,
            base_url: parse_base_url(base_url)?,
            anon_key: anon_key.to_string(),
            access_token: None,
        })
    }

    /// Row-level access is evaluated against this token; without one the anon key is used.
    pub fn set_access_token(&mut self, token: Option<String>) {
        self.access_token = token;
    }

    fn request(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        let url = self.base_url.join(REST_PATH)?.join(table)?;
        let bearer = self.access_token.as_deref().unwrap_or(&self.anon_key);
        Ok(self
            .client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .header(AUTHORIZATION, format!("Bearer {bearer}")))
    }

    pub async fn select<T: DeserializeOwned>(&self, query: &Query) -> Result<Vec<T>> {
        tracing::debug!("select from {} ({})", query.table, query.select);
        let response = self
            .request(Method::GET, query.table)?
            .query(&query.params())
            .send()
            .await?;
        let rows = check(response).await?.json().await?;
        Ok(rows)
    }

    /// Read exactly one row; zero matching rows is a `NotFound`.
    pub async fn select_single<T: DeserializeOwned>(&self, query: &Query) -> Result<T> {
        tracing::debug!("select single from {}", query.table);
        let response = self
            .request(Method::GET, query.table)?
            .query(&query.params())
            .header(ACCEPT, SINGLE_OBJECT)
            .send()
            .await?;
        let row = check(response).await?.json().await?;
        Ok(row)
    }

    /// Insert one row and return it as stored.
    pub async fn insert<B, T>(&self, table: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        tracing::debug!("insert into {}", table);
        let response = self
            .request(Method::POST, table)?
            .header("Prefer", "return=representation")
            .header(ACCEPT, SINGLE_OBJECT)
            .json(body)
            .send()
            .await?;
        let row = check(response).await?.json().await?;
        Ok(row)
    }

    /// Partial update of the row with the given id.
    pub async fn update<B>(&self, table: &str, id: &str, body: &B) -> Result<()>
    where
        B: Serialize + ?Sized,
    {
        tracing::debug!("update {} id={}", table, id);
        let response = self
            .request(Method::PATCH, table)?
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=minimal")
            .json(body)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}

async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_error(status.as_u16(), &body))
}

fn classify_error(status: u16, body: &str) -> AppError {
    let error: PostgrestError = serde_json::from_str(body).unwrap_or_default();
    let message = error
        .message
        .clone()
        .unwrap_or_else(|| body.trim().to_string());

    if error.code.as_deref() == Some(NO_ROWS_CODE) {
        return AppError::NotFound(message);
    }

    let haystack = [
        error.message.as_deref(),
        error.details.as_deref(),
        error.hint.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    if let Some(name) = KNOWN_CONSTRAINTS.iter().find(|c| haystack.contains(*c)) {
        return AppError::ConstraintViolation {
            constraint: name.to_string(),
            message,
        };
    }
    if error.code.as_deref() == Some(CHECK_VIOLATION_CODE) {
        return AppError::ConstraintViolation {
            constraint: CHECK_VIOLATION_CODE.to_string(),
            message,
        };
    }

    AppError::Remote { status, message }
}
