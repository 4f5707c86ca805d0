use crate::state::AppState;
use axum::{extract::State, response::IntoResponse, Json};
use serde_json::json;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let (jackett, stremio) = tokio::join!(
        state.indexer.health(),
        state.manager.transcoder().health()
    );

    Json(json!({
        "status": "ok",
        "services": {
            "jackett": if jackett { "up" } else { "down" },
            "stremio": if stremio { "up" } else { "down" },
        },
    }))
}
