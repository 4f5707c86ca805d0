//! Stream session core: turns a magnet link into a pollable, resumable
//! playback session backed by a Stremio-style transcoding daemon.
//!
//! The pieces compose bottom-up: [`magnet`] validates input, [`files`] picks
//! the playable video out of a torrent, [`transcoder`] speaks the daemon's
//! HTTP API, [`registry`] tracks the single active session per user, and
//! [`manager`] wires them together for the HTTP layer.

pub mod files;
pub mod indexer;
pub mod magnet;
pub mod manager;
pub mod registry;
pub mod transcoder;

pub use indexer::{IndexerClient, IndexerError};
pub use magnet::MagnetError;
pub use manager::{StreamError, StreamManager, StreamMetadata};
pub use registry::{SessionRegistry, StreamSession};
pub use transcoder::{
    CleanupOutcome, StreamStatus, TranscodeProgress, TranscoderClient, TranscoderError,
};
