//! HTTP client for the supervisor gateway.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use url::Url;

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from supervisor API operations.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid supervisor API URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("Supervisor API request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Supervisor API returned {status} for {url}")]
    Status { status: u16, url: String },
}

/// Build an HTTP client with proper timeout configuration.
fn build_http_client() -> Result<Client, ApiError> {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(ApiError::Client)
}

/// Supervisor HTTP API client.
#[derive(Debug, Clone)]
pub struct SupervisorApi {
    client: Client,
    base_url: Url,
}

impl SupervisorApi {
    /// Create a client for the gateway at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidUrl` if `base_url` does not parse, or
    /// `ApiError::Client` if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        let mut parsed = Url::parse(base_url).map_err(|source| ApiError::InvalidUrl {
            url: base_url.to_string(),
            source,
        })?;
        // Ensure relative joins append to the configured path.
        if !parsed.path().ends_with('/') {
            let path = format!("{}/", parsed.path());
            parsed.set_path(&path);
        }
        Ok(Self {
            client: build_http_client()?,
            base_url: parsed,
        })
    }

    /// The gateway base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// List all services loaded in the supervisor (`GET /services`).
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport failure, a non-success status, or an
    /// undecodable body.
    pub async fn services(&self) -> Result<Value, ApiError> {
        self.get_json("services").await
    }

    /// Describe one service (`GET /services/{name}/{group}`).
    ///
    /// # Errors
    ///
    /// See [`SupervisorApi::services`].
    pub async fn service(&self, name: &str, group: &str) -> Result<Value, ApiError> {
        self.get_json(&format!("services/{name}/{group}")).await
    }

    /// Health check result of one service (`GET /services/{name}/{group}/health`).
    ///
    /// # Errors
    ///
    /// See [`SupervisorApi::services`].
    pub async fn service_health(&self, name: &str, group: &str) -> Result<Value, ApiError> {
        self.get_json(&format!("services/{name}/{group}/health"))
            .await
    }

    /// Census of the supervisor ring (`GET /census`).
    ///
    /// # Errors
    ///
    /// See [`SupervisorApi::services`].
    pub async fn census(&self) -> Result<Value, ApiError> {
        self.get_json("census").await
    }

    async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|source| ApiError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                source,
            })?;

        tracing::debug!(url = %url, "Querying supervisor API");
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json().await?)
    }
}
