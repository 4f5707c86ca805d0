//! In-memory session registry: at most one active stream session per user.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::{Instant, SystemTime};
use tokio::sync::RwLock;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// Monotonic seconds since process start; used for activity bookkeeping.
pub(crate) fn elapsed_secs() -> i64 {
    START_TIME.get_or_init(Instant::now).elapsed().as_secs() as i64
}

/// One in-flight torrent-to-video pipeline.
#[derive(Debug, Clone)]
pub struct StreamSession {
    /// 40-char lowercase hex, canonical identity; derived from the magnet
    /// at ingest and never recomputed.
    pub info_hash: String,
    /// Which file within the torrent is the playable video. Chosen once at
    /// session creation, immutable.
    pub file_index: usize,
    /// Original input, retained for diagnostics.
    pub magnet_link: String,
    pub movie_title: Option<String>,
    /// Proxy-facing URL the client plays from.
    pub stream_url: String,
    pub started_at: SystemTime,
    pub needs_transcoding: bool,
    pub last_activity: i64,
    pub playing: bool,
}

impl StreamSession {
    pub fn new(
        info_hash: impl Into<String>,
        file_index: usize,
        magnet_link: impl Into<String>,
        movie_title: Option<String>,
        stream_url: impl Into<String>,
    ) -> Self {
        StreamSession {
            info_hash: info_hash.into(),
            file_index,
            magnet_link: magnet_link.into(),
            movie_title,
            stream_url: stream_url.into(),
            started_at: SystemTime::now(),
            needs_transcoding: true,
            last_activity: elapsed_secs(),
            playing: false,
        }
    }
}

/// Sessions keyed by user id. Same-user races on `replace` are last-write-
/// wins; the single-active-session invariant holds either way.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, StreamSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        SessionRegistry::default()
    }

    /// Installs `session` for the user, returning whatever it displaced.
    pub async fn replace(&self, user_id: &str, session: StreamSession) -> Option<StreamSession> {
        let mut sessions = self.sessions.write().await;
        sessions.insert(user_id.to_string(), session)
    }

    /// Removes and returns the user's session, whatever its hash.
    pub async fn take(&self, user_id: &str) -> Option<StreamSession> {
        let mut sessions = self.sessions.write().await;
        sessions.remove(user_id)
    }

    pub async fn get(&self, user_id: &str) -> Option<StreamSession> {
        let sessions = self.sessions.read().await;
        sessions.get(user_id).cloned()
    }

    /// Removes the user's session only when it matches `info_hash`.
    pub async fn remove(&self, user_id: &str, info_hash: &str) -> Option<StreamSession> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(user_id) {
            Some(s) if s.info_hash == info_hash => sessions.remove(user_id),
            _ => None,
        }
    }

    /// Records an activity ping. Returns false when no matching session
    /// exists, which callers treat as harmless staleness.
    pub async fn touch(&self, user_id: &str, info_hash: &str, playing: bool) -> bool {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(user_id) {
            Some(s) if s.info_hash == info_hash => {
                s.last_activity = elapsed_secs();
                s.playing = playing;
                true
            }
            _ => false,
        }
    }

    /// Sessions whose last activity predates `cutoff`, as (user, hash) pairs.
    pub async fn idle_since(&self, cutoff: i64) -> Vec<(String, String)> {
        let sessions = self.sessions.read().await;
        sessions
            .iter()
            .filter(|(_, s)| s.last_activity < cutoff)
            .map(|(user, s)| (user.clone(), s.info_hash.clone()))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.sessions.write().await.clear();
    }
}
