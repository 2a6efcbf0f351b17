use axum::Json;
use axum::extract::{Query, State};
use serde_json::json;

use crate::store::Store;
use crate::web::AppState;
use crate::web::error::ApiResult;

#[derive(serde::Deserialize)]
pub struct TimelineQuery {
    limit: Option<i64>,
}

pub async fn api_timeline(
    State(state): State<AppState>,
    Query(query): Query<TimelineQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let events = state.store.recent_timeline(limit).await?;
    Ok(Json(json!({ "success": true, "events": events })))
}
