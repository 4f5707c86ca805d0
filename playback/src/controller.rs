//! The playback state machine.
//!
//! `Idle → Requesting → Transcoding → Ready → Error`, with a direct
//! `Idle → Ready` hop when the backend says no transcoding is needed. The
//! controller owns two timers: the metadata poll while transcoding (stopped
//! the moment a source URL is set) and the activity ping while ready. Both
//! die with the controller; only an explicit [`stop`] touches the backend
//! session.
//!
//! [`stop`]: PlaybackController::stop

use crate::client::ApiClient;
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The surface the embedding UI renders into: an HTML video element, an
/// mpv window, a test double. Error events flow back in through
/// [`PlaybackController::media_error`].
pub trait MediaElement: Send + Sync + 'static {
    fn set_source(&self, url: &str);
    fn play(&self);
    fn pause(&self);
}

/// Browser media error categories, mapped to user-facing messages with
/// torrent-specific hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    Aborted,
    Network,
    Decode,
    SourceNotSupported,
}

impl MediaErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            MediaErrorKind::Aborted => "Playback was aborted",
            MediaErrorKind::Network => {
                "A network error interrupted playback; the torrent may still be downloading"
            }
            MediaErrorKind::Decode => {
                "The video could not be decoded; it may be corrupt or still downloading"
            }
            MediaErrorKind::SourceNotSupported => {
                "This video format is not supported; the stream may not be ready yet"
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerState {
    Idle,
    Requesting,
    Transcoding {
        info_hash: String,
        progress: String,
        stats: Option<Value>,
    },
    Ready {
        playback_url: String,
        playing: bool,
    },
    Error {
        message: String,
        /// Informational only; retries past the number shown in the UI are
        /// not blocked.
        retries: u32,
    },
}

#[derive(Debug, Clone)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    pub activity_interval: Duration,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions {
            poll_interval: Duration::from_secs(3),
            activity_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone)]
struct CurrentStream {
    info_hash: String,
    stream_url: String,
}

struct Inner<M: MediaElement> {
    api: Arc<ApiClient>,
    media: Arc<M>,
    options: ControllerOptions,
    state: watch::Sender<PlayerState>,
    current: Mutex<Option<CurrentStream>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    retries: AtomicU32,
}

pub struct PlaybackController<M: MediaElement> {
    inner: Arc<Inner<M>>,
}

impl<M: MediaElement> PlaybackController<M> {
    pub fn new(api: Arc<ApiClient>, media: Arc<M>) -> Self {
        Self::with_options(api, media, ControllerOptions::default())
    }

    pub fn with_options(api: Arc<ApiClient>, media: Arc<M>, options: ControllerOptions) -> Self {
        let (state, _) = watch::channel(PlayerState::Idle);
        PlaybackController {
            inner: Arc::new(Inner {
                api,
                media,
                options,
                state,
                current: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
                retries: AtomicU32::new(0),
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PlayerState> {
        self.inner.state.subscribe()
    }

    pub fn state(&self) -> PlayerState {
        self.inner.state.borrow().clone()
    }

    /// Requests a stream for the magnet and drives the session to readiness.
    pub async fn start(&self, magnet_link: &str, movie_title: Option<&str>) {
        let inner = &self.inner;
        inner.cancel_timers();
        inner.retries.store(0, Ordering::SeqCst);
        inner.set_state(PlayerState::Requesting);

        let created = match inner.api.create_stream(magnet_link, movie_title).await {
            Ok(created) => created,
            Err(err) => {
                inner.fail(format!("Failed to start stream: {}", err));
                return;
            }
        };

        *inner.current.lock().unwrap() = Some(CurrentStream {
            info_hash: created.info_hash.clone(),
            stream_url: created.stream_url.clone(),
        });

        if created.needs_transcoding {
            inner.set_state(PlayerState::Transcoding {
                info_hash: created.info_hash.clone(),
                progress: "0.0%".to_string(),
                stats: None,
            });
            let task_inner = Arc::clone(inner);
            let handle = tokio::spawn(async move {
                Inner::poll_loop(task_inner, created.info_hash, created.stream_url).await;
            });
            inner.tasks.lock().unwrap().push(handle);
        } else {
            Inner::go_ready(inner, &created.stream_url).await;
        }
    }

    pub fn pause(&self) {
        self.inner.media.pause();
        self.inner.update_playing(false);
    }

    pub fn resume(&self) {
        self.inner.media.play();
        self.inner.update_playing(true);
    }

    /// Entry point for media element error events.
    pub fn media_error(&self, kind: MediaErrorKind) {
        self.inner.set_state(PlayerState::Error {
            message: kind.message().to_string(),
            retries: self.inner.retries.load(Ordering::SeqCst),
        });
    }

    /// Manual retry: re-derives the playback URL and reloads the element.
    /// The counter is for display; nothing enforces a maximum.
    pub async fn retry(&self) {
        let inner = &self.inner;
        let retries = inner.retries.fetch_add(1, Ordering::SeqCst) + 1;
        let current = inner.current.lock().unwrap().clone();
        match current {
            Some(current) => match inner.api.playback_url(&current.stream_url).await {
                Ok(url) => {
                    inner.media.set_source(&url);
                    inner.media.play();
                    inner.set_state(PlayerState::Ready {
                        playback_url: url,
                        playing: true,
                    });
                }
                Err(err) => inner.set_state(PlayerState::Error {
                    message: format!("Retry failed: {}", err),
                    retries,
                }),
            },
            None => inner.set_state(PlayerState::Error {
                message: "No active stream to retry".to_string(),
                retries,
            }),
        }
    }

    /// Explicit user stop: tears the backend session down too.
    pub async fn stop(&self) {
        let inner = &self.inner;
        inner.cancel_timers();
        let current = inner.current.lock().unwrap().take();
        if let Some(current) = current {
            if let Err(err) = inner.api.stop_stream(&current.info_hash).await {
                tracing::warn!(error = %err, "failed to stop stream on backend");
            }
        }
        inner.retries.store(0, Ordering::SeqCst);
        inner.set_state(PlayerState::Idle);
    }

    /// Navigation-away teardown: timers stop, the backend session is left
    /// for its own reaping.
    pub fn detach(&self) {
        self.inner.cancel_timers();
        self.inner.set_state(PlayerState::Idle);
    }
}

impl<M: MediaElement> Inner<M> {
    /// Metadata polling: runs until the server reports the file ready, then
    /// hands off to playback and exits so no redundant polls hit an
    /// already-playing session.
    async fn poll_loop(inner: Arc<Inner<M>>, info_hash: String, stream_url: String) {
        let mut interval = tokio::time::interval(inner.options.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            match inner.api.stream_metadata(&info_hash).await {
                Ok(meta) if meta.file_ready => {
                    Inner::go_ready(&inner, &stream_url).await;
                    return;
                }
                Ok(meta) => {
                    inner.set_state(PlayerState::Transcoding {
                        info_hash: info_hash.clone(),
                        progress: meta
                            .transcoding_progress
                            .unwrap_or_else(|| "0.0%".to_string()),
                        stats: meta.stremio_stats,
                    });
                }
                Err(err) => {
                    inner.fail(format!("Metadata poll failed: {}", err));
                    return;
                }
            }
        }
    }

    async fn go_ready(inner: &Arc<Inner<M>>, stream_url: &str) {
        let playback_url = match inner.api.playback_url(stream_url).await {
            Ok(url) => url,
            Err(err) => {
                inner.fail(format!("Failed to build playback URL: {}", err));
                return;
            }
        };

        inner.media.set_source(&playback_url);
        inner.media.play();
        inner.set_state(PlayerState::Ready {
            playback_url,
            playing: true,
        });

        let current = inner.current.lock().unwrap().clone();
        if let Some(current) = current {
            let task_inner = Arc::clone(inner);
            let handle = tokio::spawn(async move {
                Inner::activity_loop(task_inner, current.info_hash).await;
            });
            inner.tasks.lock().unwrap().push(handle);
        }
    }

    /// Periodic play/pause report so the backend can reap idle sessions.
    async fn activity_loop(inner: Arc<Inner<M>>, info_hash: String) {
        let mut interval = tokio::time::interval(inner.options.activity_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        interval.tick().await;
        loop {
            interval.tick().await;
            let playing = match &*inner.state.borrow() {
                PlayerState::Ready { playing, .. } => *playing,
                _ => return,
            };
            if let Err(err) = inner.api.record_activity(&info_hash, playing).await {
                tracing::debug!(error = %err, "activity ping failed");
            }
        }
    }

    fn update_playing(&self, playing: bool) {
        let state = self.state.borrow().clone();
        if let PlayerState::Ready { playback_url, .. } = state {
            self.set_state(PlayerState::Ready {
                playback_url,
                playing,
            });
        }
    }

    fn cancel_timers(&self) {
        for handle in self.tasks.lock().unwrap().drain(..) {
            handle.abort();
        }
    }

    fn set_state(&self, state: PlayerState) {
        self.state.send_replace(state);
    }

    fn fail(&self, message: String) {
        self.set_state(PlayerState::Error {
            message,
            retries: self.retries.load(Ordering::SeqCst),
        });
    }
}

impl<M: MediaElement> Drop for PlaybackController<M> {
    fn drop(&mut self) {
        // Timer tasks hold their own Arc of the shared internals; aborting
        // them here lets everything unwind when the controller goes away.
        self.inner.cancel_timers();
    }
}
