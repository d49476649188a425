use axum::extract::State;
use axum::response::{IntoResponse, Json};
use goalconvo_pipeline::{PipelineOrchestrator, RunPipelineRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/run-pipeline`. Validates the request, spawns the run, and
/// returns immediately — progress and the final result are streamed into
/// `session_id`'s room over `/ws`.
pub async fn run_pipeline(
    State(state): State<AppState>,
    Json(req): Json<RunPipelineRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let session_id = req.session_id.clone();
    let orchestrator = PipelineOrchestrator::new(state.ctx.clone());
    orchestrator.start(req)?;
    Ok(Json(serde_json::json!({
        "accepted": true,
        "session_id": session_id,
    })))
}
