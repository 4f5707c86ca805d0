//! Client-side playback: an API client for the streaming backend and a
//! timer-driven controller modelling the
//! `idle → requesting → transcoding → ready → error` lifecycle a player UI
//! drives against a media element.

pub mod client;
pub mod controller;

pub use client::{ApiClient, ApiClientError, CreatedStream, StreamMetadata};
pub use controller::{
    ControllerOptions, MediaElement, MediaErrorKind, PlaybackController, PlayerState,
};
