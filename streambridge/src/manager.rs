//! Composition root tying ingest, registry and transcoder together.

use crate::files;
use crate::magnet::{self, MagnetError};
use crate::registry::{elapsed_secs, SessionRegistry, StreamSession};
use crate::transcoder::{StreamStatus, TranscoderClient, TranscoderError};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const REAP_INTERVAL: Duration = Duration::from_secs(60);
const IDLE_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum StreamError {
    #[error(transparent)]
    Magnet(#[from] MagnetError),
    #[error(transparent)]
    Transcoder(#[from] TranscoderError),
}

/// Metadata poll response, serialized as the client sees it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    pub info_hash: String,
    pub transcoding: bool,
    pub transcoding_progress: String,
    pub file_ready: bool,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stremio_stats: Option<Value>,
}

impl StreamMetadata {
    pub fn not_found(info_hash: &str) -> Self {
        StreamMetadata {
            info_hash: info_hash.to_string(),
            transcoding: false,
            transcoding_progress: "0.0%".to_string(),
            file_ready: false,
            status: StreamStatus::NotFound.as_str(),
            stremio_stats: None,
        }
    }
}

pub struct StreamManager {
    registry: Arc<SessionRegistry>,
    transcoder: Arc<TranscoderClient>,
}

impl StreamManager {
    /// Builds the manager and spawns the idle-session reaper. Must be called
    /// from within a tokio runtime.
    pub fn new(registry: Arc<SessionRegistry>, transcoder: Arc<TranscoderClient>) -> Self {
        spawn_reaper(registry.clone(), transcoder.clone());
        StreamManager {
            registry,
            transcoder,
        }
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn transcoder(&self) -> &TranscoderClient {
        &self.transcoder
    }

    /// Full stream-creation flow: ingest the magnet, purge any prior session
    /// for the user (remote teardown is advisory and never blocks the
    /// replacement), register the torrent with the daemon, pick the main
    /// video file and install the new session.
    pub async fn start_stream(
        &self,
        user_id: &str,
        magnet_link: &str,
        movie_title: Option<String>,
        public_base: &str,
    ) -> Result<StreamSession, StreamError> {
        let info_hash = magnet::ingest(magnet_link)?;

        if let Some(prior) = self.registry.take(user_id).await {
            self.transcoder.destroy_session(&prior.info_hash).await.log();
        }

        let created = self.transcoder.create_session(&info_hash, magnet_link).await?;
        let files = if created.files.is_empty() {
            // Magnet-only creates return before metadata resolves; wait a
            // bounded interval for the file list.
            self.transcoder
                .wait_for_files(&info_hash)
                .await
                .unwrap_or_default()
        } else {
            created.files
        };
        let file_index = files::select_main_file(&files);

        let stream_url = format!("{}/stream/{}", public_base.trim_end_matches('/'), info_hash);
        let session = StreamSession::new(
            info_hash,
            file_index,
            magnet_link,
            movie_title,
            stream_url,
        );
        self.registry.replace(user_id, session.clone()).await;

        tracing::info!(
            info_hash = %session.info_hash,
            file_index,
            user_id,
            "stream session created"
        );
        Ok(session)
    }

    /// Metadata poll for `(user, infoHash)`. An unknown session reports
    /// `not_found` without contacting the daemon; a poll racing a concurrent
    /// delete may briefly observe either outcome, which callers tolerate.
    pub async fn metadata(
        &self,
        user_id: &str,
        info_hash: &str,
    ) -> Result<StreamMetadata, StreamError> {
        let session = match self.registry.get(user_id).await {
            Some(s) if s.info_hash == info_hash => s,
            _ => return Ok(StreamMetadata::not_found(info_hash)),
        };

        let report = self
            .transcoder
            .poll_progress(info_hash, session.file_index)
            .await?;
        let progress = report.progress;
        Ok(StreamMetadata {
            info_hash: info_hash.to_string(),
            transcoding: progress.status != StreamStatus::NotFound,
            transcoding_progress: progress.display_percent(),
            file_ready: progress.file_ready,
            status: progress.status.as_str(),
            stremio_stats: report.raw_stats,
        })
    }

    /// Explicit stop. Registry removal is authoritative; the remote
    /// teardown is best-effort.
    pub async fn stop_stream(&self, user_id: &str, info_hash: &str) -> bool {
        match self.registry.remove(user_id, info_hash).await {
            Some(session) => {
                self.transcoder
                    .destroy_session(&session.info_hash)
                    .await
                    .log();
                true
            }
            None => false,
        }
    }

    pub async fn record_activity(&self, user_id: &str, info_hash: &str, playing: bool) -> bool {
        self.registry.touch(user_id, info_hash, playing).await
    }
}

/// Periodically drops sessions with no activity pings, mirroring the
/// engine timeout the transcoding daemon applies on its side.
fn spawn_reaper(registry: Arc<SessionRegistry>, transcoder: Arc<TranscoderClient>) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(REAP_INTERVAL).await;
            let cutoff = elapsed_secs() - IDLE_TIMEOUT.as_secs() as i64;
            for (user_id, info_hash) in registry.idle_since(cutoff).await {
                tracing::debug!(%user_id, %info_hash, "reaping idle stream session");
                if registry.remove(&user_id, &info_hash).await.is_some() {
                    transcoder.destroy_session(&info_hash).await.log();
                }
            }
        }
    });
}
