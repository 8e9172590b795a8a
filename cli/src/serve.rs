use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use orchestrator::Orchestrator;
use serde_json::json;
use tracing::info;

#[derive(Clone)]
pub struct ServeState {
    orchestrator: Arc<Orchestrator>,
}

impl ServeState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// Liveness probe: always 200 while the process is running.
async fn live() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}

/// Readiness probe: 200 only while the orchestrator reports itself healthy
/// (not closed, and every registered source healthy).
async fn ready(State(state): State<ServeState>) -> impl IntoResponse {
    if state.orchestrator.is_healthy().await {
        (StatusCode::OK, Json(json!({"status": "ok"})))
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "error"})),
        )
    }
}

pub fn router(state: ServeState) -> Router {
    Router::new()
        .route("/live", get(live))
        .route("/ready", get(ready))
        .with_state(state)
}

pub async fn run(orchestrator: Arc<Orchestrator>, port: u16) -> Result<(), std::io::Error> {
    let app = router(ServeState::new(orchestrator));
    let address = format!("0.0.0.0:{port}");
    info!(%address, "starting server");
    let listener = tokio::net::TcpListener::bind(&address).await?;
    axum::serve(listener, app).await
}
