mod auth;
mod rest;

pub use auth::AuthClient;
pub use rest::{Query, RestClient};

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::error::Result;

const USER_AGENT_STRING: &str = concat!("study-tracker/", env!("CARGO_PKG_VERSION"));

fn build_http_client(timeout: Duration) -> Result<Client> {
    let client = Client::builder()
        .timeout(timeout)
        .connect_timeout(Duration::from_secs(10))
        .user_agent(USER_AGENT_STRING)
        .build()?;
    Ok(client)
}

/// Parse the project URL so that relative joins keep any path prefix.
fn parse_base_url(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim();
    let mut url = Url::parse(trimmed)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_keeps_prefix_for_joins() {
        let url = parse_base_url("http://localhost:54321/proxy").unwrap();
        assert_eq!(
            url.join("rest/v1/subjects").unwrap().as_str(),
            "http://localhost:54321/proxy/rest/v1/subjects"
        );

        let url = parse_base_url("https://demo.supabase.co").unwrap();
        assert_eq!(
            url.join("auth/v1/logout").unwrap().as_str(),
            "https://demo.supabase.co/auth/v1/logout"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(parse_base_url("not a url").is_err());
    }
}
