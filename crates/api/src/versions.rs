use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Json};
use goalconvo_domain::error::Error;
use goalconvo_domain::version::ExportFormat;
use serde::Deserialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListVersionsQuery {
    #[serde(default)]
    pub tags: Option<String>,
}

/// `GET /api/versions`.
pub async fn list_versions(State(state): State<AppState>, Query(q): Query<ListVersionsQuery>) -> impl IntoResponse {
    let tags: Option<Vec<String>> = q.tags.map(|raw| raw.split(',').map(str::to_string).collect());
    let versions = state.ctx.version_manager.list_versions(tags.as_deref());
    let total = versions.len();
    Json(serde_json::json!({ "versions": versions, "total": total }))
}

/// `GET /api/versions/:id`.
pub async fn get_version(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let version = state
        .ctx
        .version_manager
        .get_version(&version_id)
        .ok_or_else(|| Error::NotFound(format!("version {version_id}")))?;
    Ok(Json(version))
}

/// `GET /api/versions/:id/dialogues`.
pub async fn get_version_dialogues(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let dialogues = state.ctx.version_manager.load_dialogues(&version_id)?;
    Ok(Json(serde_json::json!({ "version_id": version_id, "dialogues": dialogues })))
}

#[derive(Debug, Deserialize)]
pub struct CompareVersionsRequest {
    pub version_a: String,
    pub version_b: String,
}

/// `POST /api/versions/compare`.
pub async fn compare_versions(
    State(state): State<AppState>,
    Json(req): Json<CompareVersionsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comparison = state
        .ctx
        .version_manager
        .compare_versions(&req.version_a, &req.version_b)?;
    Ok(Json(comparison))
}

#[derive(Debug, Deserialize)]
pub struct TagVersionRequest {
    pub tags: Vec<String>,
}

/// `POST /api/versions/:id/tag`.
pub async fn tag_version(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
    Json(req): Json<TagVersionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state.ctx.version_manager.tag_version(&version_id, req.tags)?;
    Ok(Json(serde_json::json!({ "version_id": version_id, "tagged": true })))
}

#[derive(Debug, Deserialize)]
pub struct ExportVersionRequest {
    pub format: ExportFormat,
    pub output_path: String,
}

/// `POST /api/versions/:id/export`.
pub async fn export_version(
    State(state): State<AppState>,
    Path(version_id): Path<String>,
    Json(req): Json<ExportVersionRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let output_path = std::path::Path::new(&req.output_path);
    state
        .ctx
        .version_manager
        .export_version(&version_id, output_path, req.format)?;
    Ok(Json(serde_json::json!({
        "version_id": version_id,
        "format": req.format,
        "output_path": req.output_path,
    })))
}
