use axum::Json;
use axum::extract::{Path, State};
use serde_json::json;
use tracing::info;

use super::truncate_chars;
use crate::store::{AgentStatus, Direction, Store};
use crate::web::AppState;
use crate::web::error::{ApiError, ApiResult};

pub async fn api_agents(State(state): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let agents = state.store.list_agents().await?;
    Ok(Json(json!({ "success": true, "agents": agents })))
}

pub async fn api_agents_status(
    State(state): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    let agents: Vec<serde_json::Value> = state
        .store
        .list_agents()
        .await?
        .into_iter()
        .map(|agent| {
            json!({
                "id": agent.id,
                "name": agent.name,
                "status": agent.status,
                "last_active": agent.last_active,
            })
        })
        .collect();
    Ok(Json(json!({ "success": true, "agents": agents })))
}

#[derive(serde::Deserialize)]
pub struct SendMessageRequest {
    message: Option<String>,
}

/// Record an outbound message: the agent goes busy, `last_active` is
/// touched, and exactly one timeline row summarizes the send.
pub async fn send_message(
    Path(agent_id): Path<i64>,
    State(state): State<AppState>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let agent = state
        .store
        .get_agent(agent_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Agent not found"))?;

    let content = payload.message.unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Err(ApiError::bad_request("Message cannot be empty"));
    }

    state
        .store
        .insert_message(agent_id, &content, Direction::Outbound)
        .await?;
    state
        .store
        .set_agent_status(agent_id, AgentStatus::Busy)
        .await?;
    state
        .store
        .insert_timeline_event(
            "message",
            &format!("Message to {}", agent.name),
            &truncate_chars(&content, 100),
            &agent.name,
        )
        .await?;

    info!("Message sent to agent {}", agent.name);

    Ok(Json(json!({
        "success": true,
        "message": "Message sent",
        "agent": agent.name,
    })))
}
