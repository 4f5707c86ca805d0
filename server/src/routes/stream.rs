use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use streambridge::StreamMetadata;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStreamRequest {
    pub magnet_link: String,
    pub movie_title: Option<String>,
}

pub async fn create_stream(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateStreamRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_user(&state.tokens, &headers)?;
    let base = state.public_base(&headers);

    let session = state
        .manager
        .start_stream(&user.user_id, &req.magnet_link, req.movie_title, &base)
        .await?;

    Ok(Json(json!({
        "streamUrl": session.stream_url,
        "infoHash": session.info_hash,
        "movieTitle": session.movie_title,
        "message": "Stream session created",
        "streamingType": "stremio_hls",
        "needsTranscoding": session.needs_transcoding,
    })))
}

pub async fn stream_metadata(
    State(state): State<AppState>,
    Path(info_hash): Path<String>,
    headers: HeaderMap,
) -> Result<Json<StreamMetadata>, ApiError> {
    let user = auth::require_user(&state.tokens, &headers)?;
    let info_hash = info_hash.to_lowercase();

    let metadata = state.manager.metadata(&user.user_id, &info_hash).await?;
    Ok(Json(metadata))
}

#[derive(Deserialize)]
pub struct ActivityRequest {
    pub playing: bool,
}

/// Play/pause pings from the client keep the session off the reaper's list.
pub async fn record_activity(
    State(state): State<AppState>,
    Path(info_hash): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ActivityRequest>,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_user(&state.tokens, &headers)?;
    let info_hash = info_hash.to_lowercase();

    state
        .manager
        .record_activity(&user.user_id, &info_hash, req.playing)
        .await;
    Ok(Json(json!({ "success": true })))
}

pub async fn stop_stream(
    State(state): State<AppState>,
    Path(info_hash): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = auth::require_user(&state.tokens, &headers)?;
    let info_hash = info_hash.to_lowercase();

    state.manager.stop_stream(&user.user_id, &info_hash).await;
    Ok(Json(json!({ "message": "Stream stopped" })))
}
