//! Client for the external transcoding/download daemon.
//!
//! The daemon exposes a Stremio-compatible surface: `POST /:infoHash/create`
//! registers a torrent from a set of peer-search sources, `stats.json`
//! endpoints report torrent- and file-level progress, `GET /:infoHash/remove`
//! tears a torrent down, and `hlsv2` serves per-file HLS output. Progress
//! responses are heterogeneous between daemon versions; [`poll_progress`]
//! normalizes them into a single [`TranscodeProgress`] model.
//!
//! [`poll_progress`]: TranscoderClient::poll_progress

use crate::files::RemoteFile;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Progress above which a small prefix of transcoded output is assumed
/// sufficient for an HLS player to start.
pub const READY_THRESHOLD_PERCENT: f64 = 5.0;

/// Client identifier attached to HLS requests against the daemon.
const HLS_CLIENT_ID: &str = "reelgate";

const CREATE_TIMEOUT: Duration = Duration::from_secs(15);
const STATS_TIMEOUT: Duration = Duration::from_secs(10);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

const SETTLE_ATTEMPTS: u32 = 10;
const SETTLE_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum TranscoderError {
    #[error("transcoder returned {status}: {body}")]
    Unavailable { status: u16, body: String },
    #[error("transcoder did not answer within {0:?}")]
    Timeout(Duration),
    #[error("transcoder request failed: {0}")]
    Request(reqwest::Error),
}

fn request_error(err: reqwest::Error, timeout: Duration) -> TranscoderError {
    if err.is_timeout() {
        TranscoderError::Timeout(timeout)
    } else {
        TranscoderError::Request(err)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    Downloading,
    Ready,
    NotFound,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Downloading => "downloading",
            StreamStatus::Ready => "ready",
            StreamStatus::NotFound => "not_found",
        }
    }
}

/// Normalized view of the daemon's raw stats. Recomputed on every poll,
/// never cached across polls.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeProgress {
    /// 0-100, rounded to one decimal.
    pub percent: f64,
    pub file_ready: bool,
    pub status: StreamStatus,
}

impl TranscodeProgress {
    pub fn from_percent(raw: f64) -> Self {
        let percent = (raw * 10.0).round() / 10.0;
        let file_ready = percent > READY_THRESHOLD_PERCENT;
        TranscodeProgress {
            percent,
            file_ready,
            status: if file_ready {
                StreamStatus::Ready
            } else {
                StreamStatus::Downloading
            },
        }
    }

    pub fn not_found() -> Self {
        TranscodeProgress {
            percent: 0.0,
            file_ready: false,
            status: StreamStatus::NotFound,
        }
    }

    pub fn display_percent(&self) -> String {
        format!("{:.1}%", self.percent)
    }
}

/// A progress reading plus the raw stats it was derived from, for
/// passthrough to clients that want peer counts and speeds.
#[derive(Debug, Clone)]
pub struct ProgressReport {
    pub progress: TranscodeProgress,
    pub raw_stats: Option<Value>,
}

/// Result of an acknowledged create call.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub files: Vec<RemoteFile>,
}

/// Outcome of a best-effort remote teardown. Callers may inspect and log it
/// but must never let it fail the enclosing operation.
#[derive(Debug)]
pub struct CleanupOutcome {
    pub info_hash: String,
    pub result: Result<(), TranscoderError>,
}

impl CleanupOutcome {
    pub fn succeeded(&self) -> bool {
        self.result.is_ok()
    }

    pub fn log(&self) {
        match &self.result {
            Ok(()) => tracing::debug!(info_hash = %self.info_hash, "removed torrent from transcoder"),
            Err(err) => tracing::warn!(
                info_hash = %self.info_hash,
                error = %err,
                "failed to remove torrent from transcoder, ignoring"
            ),
        }
    }
}

pub struct TranscoderClient {
    base_url: String,
    http: reqwest::Client,
}

impl TranscoderClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        TranscoderClient {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Registers a torrent with the daemon. The peer-search sources carry an
    /// explicit DHT bootstrap entry alongside the magnet so discovery is
    /// attempted even when the daemon's defaults would disable it.
    pub async fn create_session(
        &self,
        info_hash: &str,
        magnet_link: &str,
    ) -> Result<CreatedSession, TranscoderError> {
        let url = format!("{}/{}/create", self.base_url, info_hash);
        let body = serde_json::json!({
            "torrent": null,
            "peerSearch": {
                "sources": [format!("dht:{}", info_hash), magnet_link],
                "min": 40,
                "max": 150,
            },
        });

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .timeout(CREATE_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error(e, CREATE_TIMEOUT))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TranscoderError::Unavailable {
                status: status.as_u16(),
                body,
            });
        }

        let value: Value = resp.json().await.map_err(TranscoderError::Request)?;
        Ok(CreatedSession {
            files: parse_files(&value),
        })
    }

    /// Bounded wait for the daemon to resolve torrent metadata after a
    /// magnet-only create, which returns before the file list is known.
    /// Gives up after a fixed number of attempts; the caller falls back to
    /// file index 0 in that case.
    pub async fn wait_for_files(&self, info_hash: &str) -> Option<Vec<RemoteFile>> {
        for attempt in 0..SETTLE_ATTEMPTS {
            if let Ok(Some(raw)) = self.torrent_stats(info_hash).await {
                let files = parse_files(&raw);
                if !files.is_empty() {
                    return Some(files);
                }
            }
            tracing::debug!(info_hash, attempt, "torrent metadata not resolved yet");
            tokio::time::sleep(SETTLE_INTERVAL).await;
        }
        None
    }

    /// Normalizes daemon progress into a single status model: torrent-level
    /// stats win when they carry a numeric progress, file-level stats are the
    /// fallback, and `not_found` is reported when neither yields a number.
    pub async fn poll_progress(
        &self,
        info_hash: &str,
        file_index: usize,
    ) -> Result<ProgressReport, TranscoderError> {
        let torrent_raw = self.torrent_stats(info_hash).await?;
        if let Some(pct) = torrent_raw.as_ref().and_then(numeric_progress) {
            return Ok(ProgressReport {
                progress: TranscodeProgress::from_percent(pct),
                raw_stats: torrent_raw,
            });
        }

        let file_url = format!("{}/{}/{}/stats.json", self.base_url, info_hash, file_index);
        let file_raw = self.stats_value(&file_url).await?;
        if let Some(pct) = file_raw.as_ref().and_then(numeric_progress) {
            return Ok(ProgressReport {
                progress: TranscodeProgress::from_percent(pct),
                raw_stats: file_raw,
            });
        }

        Ok(ProgressReport {
            progress: TranscodeProgress::not_found(),
            raw_stats: torrent_raw.or(file_raw),
        })
    }

    async fn torrent_stats(&self, info_hash: &str) -> Result<Option<Value>, TranscoderError> {
        let url = format!("{}/{}/stats.json", self.base_url, info_hash);
        self.stats_value(&url).await
    }

    /// Non-success statuses come back as `None`: a torrent the daemon does
    /// not know about is an expected state, not an error.
    async fn stats_value(&self, url: &str) -> Result<Option<Value>, TranscoderError> {
        let resp = self
            .http
            .get(url)
            .timeout(STATS_TIMEOUT)
            .send()
            .await
            .map_err(|e| request_error(e, STATS_TIMEOUT))?;

        if !resp.status().is_success() {
            return Ok(None);
        }
        Ok(resp.json().await.ok())
    }

    /// Best-effort teardown. Never fails the caller; inspect the returned
    /// [`CleanupOutcome`] for logging.
    pub async fn destroy_session(&self, info_hash: &str) -> CleanupOutcome {
        let url = format!("{}/{}/remove", self.base_url, info_hash);
        let result = match self.http.get(&url).timeout(STATS_TIMEOUT).send().await {
            Ok(resp) if resp.status().is_success() => Ok(()),
            Ok(resp) => Err(TranscoderError::Unavailable {
                status: resp.status().as_u16(),
                body: String::new(),
            }),
            Err(err) => Err(request_error(err, STATS_TIMEOUT)),
        };
        CleanupOutcome {
            info_hash: info_hash.to_string(),
            result,
        }
    }

    /// The daemon's per-file HLS endpoint for a session.
    pub fn hls_url(&self, info_hash: &str, file_index: usize) -> String {
        format!(
            "{}/hlsv2/{}/{}/master.m3u8?client={}",
            self.base_url, info_hash, file_index, HLS_CLIENT_ID
        )
    }

    /// Issues the upstream playback request, propagating byte-range
    /// semantics. Deliberately has no request timeout: playback responses
    /// are long-lived streams that end when either side closes.
    pub async fn fetch_stream(
        &self,
        info_hash: &str,
        file_index: usize,
        range: Option<&str>,
    ) -> Result<reqwest::Response, TranscoderError> {
        let url = self.hls_url(info_hash, file_index);
        self.http
            .get(&url)
            .header(reqwest::header::RANGE, range.unwrap_or("bytes=0-"))
            .send()
            .await
            .map_err(TranscoderError::Request)
    }

    pub async fn health(&self) -> bool {
        let url = format!("{}/heartbeat", self.base_url);
        match self.http.get(&url).timeout(HEALTH_TIMEOUT).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Accepts `progress` (already a percent) or the daemon's own
/// `streamProgress` fraction scaled up.
fn numeric_progress(raw: &Value) -> Option<f64> {
    raw.get("progress")
        .and_then(Value::as_f64)
        .or_else(|| raw.get("streamProgress").and_then(Value::as_f64).map(|p| p * 100.0))
}

fn parse_files(raw: &Value) -> Vec<RemoteFile> {
    raw.get("files")
        .cloned()
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}
