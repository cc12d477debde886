//! Upstream list retrieval

use crate::entry::split_lines;
use crate::error::FetchError;
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

/// Somewhere newline-delimited address lists come from
#[async_trait]
pub trait ListSource: Send + Sync {
    /// Fetch `url` and return its non-blank lines
    async fn fetch_lines(&self, url: &str) -> Result<Vec<String>, FetchError>;
}

/// Fetches lists over HTTP(S)
#[derive(Clone)]
pub struct HttpListSource {
    client: Client,
}

impl HttpListSource {
    /// Create a source with its own connection pool
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("subgen/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ListSource for HttpListSource {
    async fn fetch_lines(&self, url: &str) -> Result<Vec<String>, FetchError> {
        debug!("Fetching list from {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await.map_err(|source| FetchError::Body {
            url: url.to_string(),
            source,
        })?;

        Ok(split_lines(&text))
    }
}
