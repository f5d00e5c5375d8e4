//! Randonautica API client
//!
//! Issues `GET {base_url}/gen/{anomaly,blindspot}?...` with bearer token
//! authorization. Non-2xx answers are turned into `{status, error}` with the
//! response body as error text, the same shape the service uses itself.

use crate::api::{ApiResponse, Endpoint, PointApi, PointQuery};
use crate::config::Config;
use crate::error::{Error, Result};
use reqwest::header::ACCEPT;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("fatum/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the point generation service
#[derive(Debug, Clone)]
pub struct RandonauticaClient {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    timeout: Duration,
}

impl RandonauticaClient {
    /// Create a client; an empty token counts as no token
    pub fn new(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.trim().is_empty()),
            timeout,
        })
    }

    /// Create a client from the `[api]` config section
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.api.base_url.clone(),
            config.api_token(),
            Duration::from_secs(config.api.timeout_secs),
        )
    }

    /// Full request URL for an endpoint and query
    pub fn url(&self, endpoint: Endpoint, query: &PointQuery) -> String {
        format!(
            "{}{}?{}",
            self.base_url,
            endpoint.path(),
            query.to_query_string()
        )
    }

    fn map_send_error(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout(self.timeout)
        } else {
            Error::Transport(format!("API request failed: {}", err))
        }
    }
}

impl PointApi for RandonauticaClient {
    fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch(&self, endpoint: Endpoint, query: &PointQuery) -> Result<ApiResponse> {
        let token = self.token.as_deref().ok_or(Error::MissingCredential)?;
        let url = self.url(endpoint, query);
        debug!(%url, "requesting points");

        let response = self
            .client
            .get(&url)
            .header(ACCEPT, "application/json")
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            return Ok(ApiResponse::Failure {
                status: status.as_u16(),
                error: body,
            });
        }

        ApiResponse::from_body(&body)
    }
}
