//! HTTP client for the streaming backend.

use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum ApiClientError {
    #[error("backend returned {status}: {message}")]
    Backend { status: u16, message: String },
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("not authenticated")]
    NotAuthenticated,
}

/// Response to a stream-creation request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedStream {
    pub stream_url: String,
    pub info_hash: String,
    pub movie_title: Option<String>,
    pub needs_transcoding: bool,
}

/// One metadata poll as the backend reports it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    pub info_hash: Option<String>,
    #[serde(default)]
    pub transcoding: bool,
    #[serde(default)]
    pub transcoding_progress: Option<String>,
    #[serde(default)]
    pub file_ready: bool,
    pub status: String,
    #[serde(default)]
    pub stremio_stats: Option<Value>,
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
    token: RwLock<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        ApiClient {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    pub async fn token(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    /// Installs a token obtained out-of-band (e.g. restored from storage).
    pub async fn set_token(&self, token: impl Into<String>) {
        *self.token.write().await = Some(token.into());
    }

    pub async fn register(&self, username: &str, password: &str) -> Result<(), ApiClientError> {
        self.authenticate("/api/register", username, password).await
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ApiClientError> {
        self.authenticate("/api/login", username, password).await
    }

    async fn authenticate(
        &self,
        path: &str,
        username: &str,
        password: &str,
    ) -> Result<(), ApiClientError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await?;
        let body: Value = check(resp).await?.json().await?;
        if let Some(token) = body.get("token").and_then(Value::as_str) {
            self.set_token(token).await;
        }
        Ok(())
    }

    async fn bearer(&self) -> Result<String, ApiClientError> {
        self.token()
            .await
            .map(|t| format!("Bearer {}", t))
            .ok_or(ApiClientError::NotAuthenticated)
    }

    pub async fn search(&self, query: &str) -> Result<Value, ApiClientError> {
        let url = format!("{}/api/search", self.base_url);
        let resp = self
            .http
            .get(&url)
            .query(&[("query", query)])
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn create_stream(
        &self,
        magnet_link: &str,
        movie_title: Option<&str>,
    ) -> Result<CreatedStream, ApiClientError> {
        let url = format!("{}/api/stream", self.base_url);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "magnetLink": magnet_link, "movieTitle": movie_title }))
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn stream_metadata(&self, info_hash: &str) -> Result<StreamMetadata, ApiClientError> {
        let url = format!("{}/api/streams/{}/metadata", self.base_url, info_hash);
        let resp = self
            .http
            .get(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn record_activity(
        &self,
        info_hash: &str,
        playing: bool,
    ) -> Result<(), ApiClientError> {
        let url = format!("{}/api/streams/{}/activity", self.base_url, info_hash);
        let resp = self
            .http
            .post(&url)
            .json(&json!({ "playing": playing }))
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    pub async fn stop_stream(&self, info_hash: &str) -> Result<(), ApiClientError> {
        let url = format!("{}/api/streams/{}", self.base_url, info_hash);
        let resp = self
            .http
            .delete(&url)
            .header(reqwest::header::AUTHORIZATION, self.bearer().await?)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }

    /// The authenticated playback URL: the session's stream URL with the
    /// bearer token appended as a query parameter, since video elements
    /// cannot attach headers.
    pub async fn playback_url(&self, stream_url: &str) -> Result<String, ApiClientError> {
        let token = self.token().await.ok_or(ApiClientError::NotAuthenticated)?;
        Ok(format!("{}?token={}", stream_url, urlencoding::encode(&token)))
    }
}

async fn check(resp: reqwest::Response) -> Result<reqwest::Response, ApiClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp
        .json::<Value>()
        .await
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_default();
    Err(ApiClientError::Backend {
        status: status.as_u16(),
        message,
    })
}
