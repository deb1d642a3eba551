//! Game server state retrieval.
//!
//! The poll loop only sees the [`StateFetcher`] trait; [`HttpStateFetcher`]
//! is the production implementation talking to the dedicated server API.

use async_trait::async_trait;
use ficsit_api::{parse_error_body, parse_query_server_state, ApiError, ApiRequest};
use ficsit_core::StateSnapshot;
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, ServerConfig};

/// Retrieves a snapshot of the remote server state.
#[async_trait]
pub trait StateFetcher: Send + Sync {
    async fn fetch(&self) -> Result<StateSnapshot, FetchError>;
}

/// Recoverable failures while polling the server.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {endpoint} failed: {error}")]
    Transport { endpoint: String, error: String },

    #[error("Server responded with status {status}: {detail}")]
    Status { status: u16, detail: String },

    #[error("Failed to decode server state: {0}")]
    Decode(#[from] ApiError),
}

/// Fetches state with a single `QueryServerState` POST.
#[derive(Debug, Clone)]
pub struct HttpStateFetcher {
    client: reqwest::Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpStateFetcher {
    /// Builds a fetcher for the configured server.
    ///
    /// Every request is bounded by `request_timeout`. When
    /// `accept_invalid_certs` is set, certificate validation is disabled.
    pub fn new(config: &ServerConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(concat!("ficsit-watch/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            token: config.token.clone(),
        })
    }

    /// Points the fetcher at a different URL (plain-HTTP test servers).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, error: reqwest::Error) -> FetchError {
        FetchError::Transport {
            endpoint: self.endpoint.clone(),
            error: error.to_string(),
        }
    }
}

#[async_trait]
impl StateFetcher for HttpStateFetcher {
    async fn fetch(&self) -> Result<StateSnapshot, FetchError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&ApiRequest::query_server_state());

        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| self.transport_error(e))?;
        let status = response.status();
        let body = response.bytes().await.map_err(|e| self.transport_error(e))?;

        if !status.is_success() {
            let detail = parse_error_body(&body)
                .map(|err| err.error_message.unwrap_or(err.error_code))
                .unwrap_or_else(|| "no details".to_string());
            return Err(FetchError::Status {
                status: status.as_u16(),
                detail,
            });
        }

        let snapshot = parse_query_server_state(&body)?;
        debug!(
            occupancy = snapshot.occupancy,
            capacity = snapshot.capacity,
            "Fetched server state"
        );
        Ok(snapshot)
    }
}
