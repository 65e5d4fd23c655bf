//! Upstream board fetching.

use tracing::debug;

use crate::error::BoardError;

/// Fetches the raw board JSON for a date.
pub trait BoardFetcher: Send + Sync + 'static {
    fn fetch(&self, date: &str) -> impl std::future::Future<Output = Result<Vec<u8>, BoardError>> + Send;
}

/// Fetches `<base_url>/<date>.json` over HTTP.
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn url_for(&self, date: &str) -> String {
        format!("{}/{date}.json", self.base_url)
    }
}

impl BoardFetcher for HttpFetcher {
    async fn fetch(&self, date: &str) -> Result<Vec<u8>, BoardError> {
        let url = self.url_for(date);
        debug!("Fetching board {url}");

        let resp = self.client.get(&url).send().await?;
        if !resp.status().is_success() {
            return Err(BoardError::Status(resp.status().as_u16()));
        }
        Ok(resp.bytes().await?.to_vec())
    }
}
