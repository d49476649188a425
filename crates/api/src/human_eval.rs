use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use goalconvo_domain::error::Error;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub dialogue_id: String,
    pub dialogue_data: serde_json::Value,
    pub assigned_to: String,
}

/// `POST /api/human-evaluation/tasks`.
pub async fn create_task(
    State(state): State<AppState>,
    Json(req): Json<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task_id = state
        .ctx
        .human_eval_store
        .create_task(&req.dialogue_id, req.dialogue_data, &req.assigned_to)?;
    Ok(Json(serde_json::json!({ "task_id": task_id })))
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub assigned_to: Option<String>,
}

/// `GET /api/human-evaluation/tasks`.
pub async fn list_tasks(State(state): State<AppState>, Query(q): Query<ListTasksQuery>) -> impl IntoResponse {
    let tasks = state.ctx.human_eval_store.list_tasks(q.assigned_to.as_deref());
    let total = tasks.len();
    Json(serde_json::json!({ "tasks": tasks, "total": total }))
}

#[derive(Debug, Deserialize)]
pub struct CreateTasksBatchRequest {
    pub items: Vec<(String, serde_json::Value)>,
    pub assigned_to: String,
}

/// `POST /api/human-evaluation/tasks/batch`.
pub async fn create_tasks_batch(
    State(state): State<AppState>,
    Json(req): Json<CreateTasksBatchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let task_ids = state
        .ctx
        .human_eval_store
        .create_tasks_batch(&req.items, &req.assigned_to)?;
    Ok(Json(serde_json::json!({ "task_ids": task_ids })))
}

/// `GET /api/human-evaluation/tasks/:id`.
pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let task = state
        .ctx
        .human_eval_store
        .get_task(&task_id)
        .ok_or_else(|| Error::NotFound(format!("task {task_id}")))?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub struct SubmitAnnotationRequest {
    pub task_id: String,
    pub annotator_id: String,
    pub dimensions: HashMap<String, f64>,
    #[serde(default)]
    pub comments: Option<String>,
    #[serde(default)]
    pub task_completed: Option<bool>,
    #[serde(default)]
    pub issues: Vec<String>,
}

/// `POST /api/human-evaluation/annotate`.
pub async fn submit_annotation(
    State(state): State<AppState>,
    Json(req): Json<SubmitAnnotationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let annotation_id = state.ctx.human_eval_store.submit_annotation(
        &req.task_id,
        &req.annotator_id,
        req.dimensions,
        req.comments,
        req.task_completed,
        req.issues,
    )?;
    Ok(Json(serde_json::json!({ "annotation_id": annotation_id })))
}

/// `GET /api/human-evaluation/dialogues/:id/annotations`.
pub async fn dialogue_annotations(
    State(state): State<AppState>,
    Path(dialogue_id): Path<String>,
) -> impl IntoResponse {
    let annotations = state.ctx.human_eval_store.annotations_for_dialogue(&dialogue_id);
    Json(serde_json::json!({ "dialogue_id": dialogue_id, "annotations": annotations }))
}

#[derive(Debug, Deserialize)]
pub struct AgreementRequest {
    pub dialogue_id: String,
    pub dimension: String,
}

/// `POST /api/human-evaluation/agreement`.
pub async fn agreement_for_dialogue(
    State(state): State<AppState>,
    Json(req): Json<AgreementRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .ctx
        .human_eval_store
        .compute_agreement(&req.dialogue_id, &req.dimension)?;
    Ok(Json(report))
}

/// `GET /api/human-evaluation/statistics`.
pub async fn statistics(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.ctx.human_eval_store.statistics())
}

/// `POST /api/human-evaluation/export`.
pub async fn export_evaluations(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let path = state.ctx.human_eval_store.export(&state.ctx.config.data_dir)?;
    Ok(Json(serde_json::json!({ "path": path.display().to_string() })))
}
