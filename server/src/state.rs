use crate::auth::{TokenKeys, UserStore};
use crate::config::Config;
use axum::http::{header, HeaderMap};
use std::sync::Arc;
use streambridge::{IndexerClient, SessionRegistry, StreamManager, TranscoderClient};

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<StreamManager>,
    pub indexer: Arc<IndexerClient>,
    pub users: Arc<UserStore>,
    pub tokens: Arc<TokenKeys>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires the store objects up from config. Must run inside the tokio
    /// runtime (the stream manager spawns its reaper task).
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let transcoder = Arc::new(TranscoderClient::new(&config.stremio_url));
        let manager = Arc::new(StreamManager::new(registry, transcoder));
        let indexer = Arc::new(IndexerClient::new(
            &config.jackett_url,
            &config.jackett_api_key,
        ));
        let tokens = Arc::new(TokenKeys::new(&config.jwt_secret));

        AppState {
            manager,
            indexer,
            users: Arc::new(UserStore::new()),
            tokens,
            config: Arc::new(config),
        }
    }

    /// Base URL clients reach this server on, for building stream URLs.
    /// Prefers the configured override, then the request's own headers.
    pub fn public_base(&self, headers: &HeaderMap) -> String {
        if let Some(url) = &self.config.public_url {
            return url.trim_end_matches('/').to_string();
        }
        let proto = headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("http");
        let host = headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| format!("127.0.0.1:{}", self.config.port));
        format!("{}://{}", proto, host)
    }
}
