use axum::{
    Json, Router,
    body::Body,
    http::{HeaderValue, Method, Request, StatusCode, Uri, header},
    middleware,
    middleware::Next,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::cors::CorsLayer;

use super::AppState;
use super::handlers::{agents, command, health, pages, projects, timeline};

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

pub(crate) fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/", get(pages::dashboard))
        .route("/agents", get(pages::agents))
        .route("/agent/{id}", get(pages::agent_detail))
        .route("/projects", get(pages::projects))
        .route("/command-center", get(pages::command_center))
        .route("/timeline", get(pages::timeline))
        .route("/api/agents", get(agents::api_agents))
        .route("/api/agents/status", get(agents::api_agents_status))
        .route("/api/agent/{id}/message", post(agents::send_message))
        .route("/api/projects", get(projects::api_projects))
        .route("/api/project/{id}/update", post(projects::update_project))
        .route("/api/timeline", get(timeline::api_timeline))
        .route("/api/spawn-agent", post(command::spawn_agent))
        .route("/api/logs", get(super::sse_logs_endpoint))
        .fallback(fallback)
        .layer(middleware::from_fn(security_headers))
        .layer(build_cors())
        .with_state(state)
}

/// Unknown paths branch on shape: API consumers get the JSON envelope,
/// browsers get an HTML page.
async fn fallback(uri: Uri) -> Response {
    if uri.path().starts_with("/api/") {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "success": false, "error": "Not found" })),
        )
            .into_response()
    } else {
        (StatusCode::NOT_FOUND, pages::not_found()).into_response()
    }
}

async fn security_headers(req: Request<Body>, next: Next) -> Response {
    let mut response = next.run(req).await;
    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'; style-src 'unsafe-inline'"),
    );
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{self, PostgresStore, SharedStore, SqliteStore, Store};
    use std::sync::Arc;
    use tower::util::ServiceExt;

    async fn seeded_state() -> (AppState, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("create temp dir");
        let store = SqliteStore::open(dir.path().join("mission_control.db"))
            .await
            .expect("open test store");
        let store: SharedStore = Arc::new(store);
        store::initialize(store.as_ref()).await.expect("initialize");

        let (log_tx, _) = tokio::sync::broadcast::channel(16);
        (AppState { store, log_tx }, dir)
    }

    /// A state whose store points at a database nothing listens on. The pool
    /// connects lazily, so construction succeeds and only use fails.
    fn unreachable_state() -> AppState {
        let store = PostgresStore::connect("postgresql://mc:mc@127.0.0.1:1/mission_control")
            .expect("build pool");
        let (log_tx, _) = tokio::sync::broadcast::channel(16);
        AppState {
            store: Arc::new(store),
            log_tx,
        }
    }

    async fn json_request(
        app: Router,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, serde_json::Value) {
        let body = match body {
            Some(json) => Body::from(serde_json::to_string(&json).unwrap()),
            None => Body::empty(),
        };

        let req = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&body_bytes).unwrap_or(serde_json::json!({}));
        (status, json)
    }

    async fn html_request(app: Router, path: &str) -> (StatusCode, String) {
        let req = Request::builder()
            .method(Method::GET)
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let body_bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        (status, String::from_utf8_lossy(&body_bytes).to_string())
    }

    // --- JSON API ---

    #[tokio::test]
    async fn get_agents_returns_seeded_fleet() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(app, Method::GET, "/api/agents", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["agents"].as_array().unwrap().len(), 5);
        assert_eq!(json["agents"][0]["name"], "Alpha");
    }

    #[tokio::test]
    async fn agents_status_exposes_expected_fields() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(app, Method::GET, "/api/agents/status", None).await;
        assert_eq!(status, StatusCode::OK);
        let first = &json["agents"][0];
        assert!(first["id"].is_i64());
        assert_eq!(first["status"], "idle");
        assert!(first["last_active"].is_string());
        assert!(first.get("role").is_none());
    }

    #[tokio::test]
    async fn get_projects_returns_seeded_rows() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(app, Method::GET, "/api/projects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["projects"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn timeline_limit_is_respected() {
        let (state, _dir) = seeded_state().await;
        for i in 0..5 {
            state
                .store
                .insert_timeline_event("message", &format!("event {i}"), "", "Alpha")
                .await
                .unwrap();
        }
        let app = build_router(state);
        let (status, json) = json_request(app, Method::GET, "/api/timeline?limit=2", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["events"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn send_message_marks_agent_busy_and_logs_once() {
        let (state, _dir) = seeded_state().await;
        let before = state.store.count_timeline().await.unwrap();

        let app = build_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/agent/1/message",
            Some(json!({ "message": "status report please" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["agent"], "Alpha");

        let agent = state.store.get_agent(1).await.unwrap().unwrap();
        assert_eq!(agent.status, "busy");

        let messages = state.store.messages_for_agent(1, 10).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].direction, "outbound");

        assert_eq!(state.store.count_timeline().await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn empty_message_is_rejected_without_writes() {
        let (state, _dir) = seeded_state().await;
        let before = state.store.count_timeline().await.unwrap();

        let app = build_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/agent/1/message",
            Some(json!({ "message": "   " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Message cannot be empty");

        assert!(state.store.messages_for_agent(1, 10).await.unwrap().is_empty());
        assert_eq!(state.store.count_timeline().await.unwrap(), before);
    }

    #[tokio::test]
    async fn message_to_unknown_agent_is_not_found() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/agent/999/message",
            Some(json!({ "message": "hello?" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Agent not found");
        assert_eq!(state.store.count_timeline().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn project_progress_clamps_high_and_low() {
        let (state, _dir) = seeded_state().await;

        let app = build_router(state.clone());
        let (status, _) = json_request(
            app,
            Method::POST,
            "/api/project/1/update",
            Some(json!({ "progress": 150 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store.get_project(1).await.unwrap().unwrap().progress, 100);

        let app = build_router(state.clone());
        let (status, _) = json_request(
            app,
            Method::POST,
            "/api/project/1/update",
            Some(json!({ "progress": -10 })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.store.get_project(1).await.unwrap().unwrap().progress, 0);
    }

    #[tokio::test]
    async fn project_update_changes_status_and_logs_once() {
        let (state, _dir) = seeded_state().await;
        let before = state.store.count_timeline().await.unwrap();

        let app = build_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/project/2/update",
            Some(json!({ "progress": 55, "status": "paused" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);

        let project = state.store.get_project(2).await.unwrap().unwrap();
        assert_eq!(project.progress, 55);
        assert_eq!(project.status, "paused");
        assert_eq!(state.store.count_timeline().await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn project_update_with_no_fields_is_rejected() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) =
            json_request(app, Method::POST, "/api/project/1/update", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No fields to update");
    }

    #[tokio::test]
    async fn project_update_unknown_id_is_not_found() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/project/99/update",
            Some(json!({ "progress": 10 })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Project not found");
    }

    #[tokio::test]
    async fn spawn_agent_records_run_and_session_id() {
        let (state, _dir) = seeded_state().await;
        let before = state.store.count_timeline().await.unwrap();

        let app = build_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/spawn-agent",
            Some(json!({ "agent_id": 5, "task": "roll out the new build" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["agent"], "Epsilon");

        let session_id = json["session_id"].as_str().unwrap();
        assert!(session_id.starts_with("subagent-"));
        assert!(session_id.ends_with("-epsilon"));

        let agent = state.store.get_agent(5).await.unwrap().unwrap();
        assert_eq!(agent.status, "active");

        let runs = state.store.recent_subagent_runs(10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].session_id, session_id);
        assert_eq!(runs[0].status, "running");

        assert_eq!(state.store.count_timeline().await.unwrap(), before + 1);
    }

    #[tokio::test]
    async fn spawn_without_agent_id_is_rejected() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/spawn-agent",
            Some(json!({ "task": "orphaned work" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "No agent selected");
    }

    #[tokio::test]
    async fn spawn_with_empty_task_is_rejected() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state.clone());
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/spawn-agent",
            Some(json!({ "agent_id": 1, "task": "  " })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "Task cannot be empty");
        assert!(state.store.recent_subagent_runs(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn spawn_for_unknown_agent_is_not_found() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(
            app,
            Method::POST,
            "/api/spawn-agent",
            Some(json!({ "agent_id": 404, "task": "ghost work" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["error"], "Agent not found");
    }

    // --- Health ---

    #[tokio::test]
    async fn health_reports_connected_store() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "connected");
        assert!(json["timestamp"].is_string());
    }

    #[tokio::test]
    async fn health_stays_200_when_database_unreachable() {
        let app = build_router(unreachable_state());
        let (status, json) = json_request(app, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["database"], "disconnected");
        assert!(json["error"].is_string());
    }

    // --- Pages ---

    #[tokio::test]
    async fn dashboard_renders_seeded_data() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, body) = html_request(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Mission Control"));
        assert!(body.contains("Alpha"));
        assert!(body.contains("YouTube Automation"));
        assert!(body.contains("Mission Control Started"));
    }

    #[tokio::test]
    async fn agent_page_renders_messages() {
        let (state, _dir) = seeded_state().await;
        state
            .store
            .insert_message(2, "check the release notes", crate::store::Direction::Outbound)
            .await
            .unwrap();
        let app = build_router(state);
        let (status, body) = html_request(app, "/agent/2").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Agent Beta"));
        assert!(body.contains("check the release notes"));
    }

    #[tokio::test]
    async fn agent_page_unknown_id_falls_back_with_flash() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, body) = html_request(app, "/agent/999").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Agent not found"));
        assert!(body.contains("Alpha"));
    }

    #[tokio::test]
    async fn pages_degrade_to_flash_when_store_is_down() {
        let app = build_router(unreachable_state());
        let (status, body) = html_request(app, "/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Error loading dashboard"));
    }

    // --- Errors & headers ---

    #[tokio::test]
    async fn unknown_api_path_returns_json_404() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, json) = json_request(app, Method::GET, "/api/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "Not found");
    }

    #[tokio::test]
    async fn unknown_page_returns_html_404() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        let (status, body) = html_request(app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("<html"));
        assert!(body.contains("Not Found"));
    }

    #[tokio::test]
    async fn security_headers_present_on_responses() {
        let (state, _dir) = seeded_state().await;
        let app = build_router(state);

        let req = Request::builder()
            .method(Method::GET)
            .uri("/api/agents")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();

        assert_eq!(
            resp.headers().get("x-content-type-options").unwrap(),
            "nosniff"
        );
        assert_eq!(resp.headers().get("x-frame-options").unwrap(), "DENY");
    }

    #[tokio::test]
    async fn route_contract_has_all_expected_paths() {
        let paths = [
            "/health",
            "/",
            "/agents",
            "/agent/1",
            "/projects",
            "/command-center",
            "/timeline",
            "/api/agents",
            "/api/agents/status",
            "/api/agent/1/message",
            "/api/projects",
            "/api/project/1/update",
            "/api/timeline",
            "/api/spawn-agent",
            "/api/logs",
        ];

        let (state, _dir) = seeded_state().await;
        let app = build_router(state);
        for path in paths {
            let req = Request::builder()
                .method(Method::DELETE)
                .uri(path)
                .body(Body::empty())
                .expect("request should build");
            let resp = app
                .clone()
                .oneshot(req)
                .await
                .expect("router oneshot should succeed");
            assert_ne!(
                resp.status(),
                StatusCode::NOT_FOUND,
                "Route missing from router: {}",
                path
            );
        }
    }
}
