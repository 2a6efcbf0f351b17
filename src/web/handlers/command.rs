use axum::Json;
use axum::extract::State;
use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::info;

use super::truncate_chars;
use crate::store::{AgentStatus, Store};
use crate::web::AppState;
use crate::web::error::{ApiError, ApiResult};

/// Session ids are derived, not random, so a run can be eyeballed back to
/// its agent and dispatch time.
pub(crate) fn session_id_for(agent_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "subagent-{}-{}",
        now.format("%Y%m%d-%H%M%S"),
        agent_name.to_lowercase()
    )
}

#[derive(serde::Deserialize)]
pub struct SpawnAgentRequest {
    agent_id: Option<i64>,
    task: Option<String>,
}

/// "Spawning" only records the dispatch: a subagent row, an `active` status
/// flip, and one timeline event. No process is started.
pub async fn spawn_agent(
    State(state): State<AppState>,
    Json(payload): Json<SpawnAgentRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let Some(agent_id) = payload.agent_id else {
        return Err(ApiError::bad_request("No agent selected"));
    };

    let task = payload.task.unwrap_or_default().trim().to_string();
    if task.is_empty() {
        return Err(ApiError::bad_request("Task cannot be empty"));
    }

    let agent = state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;

    let session_id = session_id_for(&agent.name, Utc::now());

    state
        .store
        .insert_subagent_run(&session_id, &agent.name, &task)
        .await?;
    state
        .store
        .set_agent_status(agent_id, AgentStatus::Active)
        .await?;
    state
        .store
        .insert_timeline_event(
            "spawn",
            &format!("Agent {} Spawned", agent.name),
            &truncate_chars(&task, 100),
            &agent.name,
        )
        .await?;

    info!(
        "Agent {} spawned for task: {}",
        agent.name,
        truncate_chars(&task, 50)
    );

    Ok(Json(json!({
        "success": true,
        "session_id": session_id,
        "agent": agent.name,
        "message": format!("Agent {} spawned successfully", agent.name),
    })))
}
