use crate::auth;
use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

/// Passthrough of the indexer's JSON; the client owns result presentation.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    auth::require_user(&state.tokens, &headers)?;

    let query = params
        .query
        .as_deref()
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .ok_or_else(|| ApiError::Validation("query parameter is required".to_string()))?;

    let results = state.indexer.search(query).await?;
    Ok(Json(results))
}
