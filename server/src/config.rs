//! Environment-driven configuration. All collaborators (indexer,
//! transcoder) are configured out-of-band; nothing here persists.

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub jwt_secret: String,
    pub jackett_url: String,
    pub jackett_api_key: String,
    pub stremio_url: String,
    /// Overrides the request-derived base for stream URLs, e.g. when the
    /// server sits behind a reverse proxy it cannot see.
    pub public_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("JWT_SECRET not set, using an insecure development secret");
            "reelgate-dev-secret".to_string()
        });

        Config {
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3001),
            jwt_secret,
            jackett_url: env_or("JACKETT_URL", "http://127.0.0.1:9117"),
            jackett_api_key: std::env::var("JACKETT_API_KEY").unwrap_or_default(),
            stremio_url: env_or("STREMIO_URL", "http://127.0.0.1:11470"),
            public_url: std::env::var("PUBLIC_URL").ok(),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}
