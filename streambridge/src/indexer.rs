//! Client for the torrent search indexer (Jackett-style API). Search
//! results pass through untouched; the caller owns presentation.

use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

const SEARCH_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error("indexer returned {status}")]
    Unavailable { status: u16 },
    #[error("indexer request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct IndexerClient {
    base_url: String,
    api_key: String,
    http: reqwest::Client,
}

impl IndexerClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        IndexerClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Queries all configured indexers, returning the raw `Results[]` JSON.
    pub async fn search(&self, query: &str) -> Result<Value, IndexerError> {
        let url = format!("{}/api/v2.0/indexers/all/results", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("apikey", self.api_key.as_str()), ("Query", query)])
            .timeout(SEARCH_TIMEOUT)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IndexerError::Unavailable {
                status: status.as_u16(),
            });
        }
        Ok(resp.json().await?)
    }

    pub async fn health(&self) -> bool {
        match self
            .http
            .get(&self.base_url)
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
            Err(_) => false,
        }
    }
}
