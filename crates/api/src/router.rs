use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;
use crate::{health, human_eval, run_pipeline, versions, ws};

/// Build the full API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/ws", get(ws::session_ws))
        .route("/api/run-pipeline", post(run_pipeline::run_pipeline))
        .route("/api/versions", get(versions::list_versions))
        .route("/api/versions/:id", get(versions::get_version))
        .route("/api/versions/:id/dialogues", get(versions::get_version_dialogues))
        .route("/api/versions/compare", post(versions::compare_versions))
        .route("/api/versions/:id/tag", post(versions::tag_version))
        .route("/api/versions/:id/export", post(versions::export_version))
        .route("/api/human-evaluation/tasks", post(human_eval::create_task))
        .route("/api/human-evaluation/tasks", get(human_eval::list_tasks))
        .route("/api/human-evaluation/tasks/batch", post(human_eval::create_tasks_batch))
        .route("/api/human-evaluation/tasks/:id", get(human_eval::get_task))
        .route("/api/human-evaluation/annotate", post(human_eval::submit_annotation))
        .route(
            "/api/human-evaluation/dialogues/:id/annotations",
            get(human_eval::dialogue_annotations),
        )
        .route("/api/human-evaluation/agreement", post(human_eval::agreement_for_dialogue))
        .route("/api/human-evaluation/statistics", get(human_eval::statistics))
        .route("/api/human-evaluation/export", post(human_eval::export_evaluations))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
