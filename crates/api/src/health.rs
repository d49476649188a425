use axum::extract::State;
use axum::response::{IntoResponse, Json};

use crate::state::AppState;

/// `GET /health`.
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "dataset_dialogues": state.ctx.dataset_store.count(),
        "versions": state.ctx.version_manager.list_versions(None).len(),
    }))
}
