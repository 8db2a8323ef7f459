//! Document retrieval over HTTP.
//!
//! The pipeline only needs "give me the body at this URI", so fetching sits
//! behind the [`Fetch`] trait. [`HttpFetcher`] is the real implementation;
//! tests substitute an in-memory one.

use crate::error::FetchError;
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Retrieves raw document text by URI.
pub trait Fetch {
    fn fetch(&self, uri: &str) -> impl Future<Output = Result<String, FetchError>> + Send;
}

/// Options for the HTTP client.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout_seconds: 60,
            user_agent: format!("legco-votes/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// `reqwest`-backed fetcher.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_seconds: u64,
}

impl HttpFetcher {
    pub fn new(options: &HttpOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(options.timeout_seconds))
            .user_agent(options.user_agent.clone())
            .build()
            .map_err(FetchError::Client)?;

        Ok(Self {
            client,
            timeout_seconds: options.timeout_seconds,
        })
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, uri: &str) -> Result<String, FetchError> {
        debug!("GET {}", uri);

        let response = self.client.get(uri).send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    uri: uri.to_string(),
                    seconds: self.timeout_seconds,
                }
            } else if e.is_connect() {
                FetchError::Connect {
                    uri: uri.to_string(),
                }
            } else {
                FetchError::Request {
                    uri: uri.to_string(),
                    source: e,
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| FetchError::Body {
            uri: uri.to_string(),
            source: e,
        })
    }
}
