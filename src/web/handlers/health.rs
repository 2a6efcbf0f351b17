use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::store::Store;
use crate::web::AppState;

/// Liveness probe. Always 200: hosts restart on failing health checks, so a
/// broken database is reported as `degraded` in the body instead.
pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    let timestamp = Utc::now().to_rfc3339();
    match state.store.ping().await {
        Ok(()) => Json(json!({
            "status": "healthy",
            "database": "connected",
            "timestamp": timestamp,
        })),
        Err(e) => {
            warn!("Health check DB issue: {e:#}");
            Json(json!({
                "status": "degraded",
                "database": "disconnected",
                "error": e.to_string(),
                "timestamp": timestamp,
            }))
        }
    }
}
