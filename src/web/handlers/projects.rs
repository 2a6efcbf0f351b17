use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;
use tracing::info;

use crate::store::{ProjectOrder, Store};
use crate::web::AppState;
use crate::web::error::{ApiError, ApiResult};

pub async fn api_projects(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let projects = state.store.list_projects(ProjectOrder::CategoryName).await?;
    Ok(Json(json!({ "success": true, "projects": projects })))
}

#[derive(serde::Deserialize)]
pub struct UpdateProjectRequest {
    progress: Option<i64>,
    status: Option<String>,
}

/// Apply progress and/or status to a project. Progress is clamped to
/// [0,100] before storage, every applied change touches `updated_at`, and
/// one timeline row records what changed.
pub async fn update_project(
    Path(project_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProjectRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let project = state
        .store
        .get_project(project_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;

    let status = payload
        .status
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    if payload.progress.is_none() && status.is_none() {
        return Err(ApiError::bad_request("No fields to update"));
    }

    let mut changes = Vec::new();
    if let Some(progress) = payload.progress {
        let progress = progress.clamp(0, 100);
        state
            .store
            .set_project_progress(project_id, progress)
            .await?;
        changes.push(format!("progress {progress}%"));
    }
    if let Some(status) = status {
        state.store.set_project_status(project_id, &status).await?;
        changes.push(format!("status {status}"));
    }

    state
        .store
        .insert_timeline_event(
            "project",
            &format!("Project {} updated", project.name),
            &changes.join(", "),
            "System",
        )
        .await?;

    info!("Project {} updated: {}", project.name, changes.join(", "));

    Ok(Json(json!({ "success": true })))
}
