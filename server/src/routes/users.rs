use crate::error::ApiError;
use crate::state::AppState;
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "username and password are required".to_string(),
        ));
    }

    let record = state.users.register(username, &req.password).await?;
    let token = state.tokens.issue(&record.id, &record.username)?;
    tracing::info!(username = %record.username, "user registered");

    Ok(Json(json!({
        "token": token,
        "user": { "id": record.id, "username": record.username },
    })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let record = state.users.verify(req.username.trim(), &req.password).await?;
    let token = state.tokens.issue(&record.id, &record.username)?;

    Ok(Json(json!({
        "token": token,
        "user": { "id": record.id, "username": record.username },
    })))
}
