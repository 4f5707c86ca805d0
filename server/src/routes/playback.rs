//! The playback proxy: authenticates ranged media requests and streams the
//! transcoder's HLS output through without buffering.

use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Response,
};
use serde::Deserialize;

const HLS_PLAYLIST_MIME: &str = "application/vnd.apple.mpegurl";

#[derive(Deserialize)]
pub struct PlaybackParams {
    pub token: Option<String>,
}

pub async fn proxy_stream(
    State(state): State<AppState>,
    Path(info_hash): Path<String>,
    Query(params): Query<PlaybackParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    // <video> elements cannot attach custom headers, so the token may
    // arrive as a query parameter instead of a bearer header.
    let token = params
        .token
        .as_deref()
        .or_else(|| auth::bearer_token(&headers))
        .ok_or(ApiError::MissingToken)?;
    let user = state.tokens.verify(token)?;

    let info_hash = info_hash.to_lowercase();

    // Lost local bookkeeping should not kill playback; fall back to file 0.
    let file_index = state
        .manager
        .registry()
        .get(&user.user_id)
        .await
        .filter(|s| s.info_hash == info_hash)
        .map(|s| s.file_index)
        .unwrap_or(0);

    state
        .manager
        .registry()
        .touch(&user.user_id, &info_hash, true)
        .await;

    let range = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let upstream = state
        .manager
        .transcoder()
        .fetch_stream(&info_hash, file_index, range)
        .await?;

    let status = upstream.status();
    if !status.is_success() {
        return Err(ApiError::StreamUnavailable(status.as_u16()));
    }

    let upstream_headers = upstream.headers().clone();
    let content_type = upstream_headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| {
            if ct.contains("mpegurl") {
                HLS_PLAYLIST_MIME
            } else {
                ct
            }
        })
        .unwrap_or("application/octet-stream")
        .to_string();

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::ACCEPT_RANGES, "bytes");

    if let Some(len) = upstream_headers.get(header::CONTENT_LENGTH) {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }

    // 206 if and only if the upstream answered with a Content-Range.
    let code = match upstream_headers.get(header::CONTENT_RANGE) {
        Some(content_range) => {
            builder = builder.header(header::CONTENT_RANGE, content_range);
            StatusCode::PARTIAL_CONTENT
        }
        None => StatusCode::OK,
    };

    // Stream the body through untouched, preserving backpressure between
    // the transcoder and the player.
    builder
        .status(code)
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|e| ApiError::Internal(e.into()))
}
