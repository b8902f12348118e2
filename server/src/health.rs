use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::{sync::Arc, time::SystemTime};

use crate::delivery::ChatService;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    timestamp: u64,
    version: String,
    checks: HealthChecks,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    sessions: SessionHealthStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    ready: bool,
    checks: ReadinessChecks,
}

#[derive(Debug, Serialize)]
pub struct ReadinessChecks {
    registry: bool,
}

/// Health status for the connection registry.
#[derive(Debug, Serialize)]
pub struct SessionHealthStatus {
    /// Number of currently open chat sessions
    active_sessions: usize,
    /// Number of users with at least one session
    online_users: usize,
    status: CheckStatus,
}

/// Liveness probe - checks if the application is running
/// Should return 200 OK if the application is alive
pub async fn liveness() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

/// Readiness probe - checks if the application is ready to serve traffic.
pub async fn readiness(
    State(chat): State<Arc<ChatService>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    // The registry is in-process; once the router is serving it is ready.
    let _ = chat.registry().session_count();

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            ready: true,
            checks: ReadinessChecks { registry: true },
        }),
    )
}

/// Health endpoint - detailed health information including session counts.
pub async fn health(State(chat): State<Arc<ChatService>>) -> (StatusCode, Json<HealthResponse>) {
    let timestamp = match SystemTime::now().duration_since(SystemTime::UNIX_EPOCH) {
        Ok(d) => d.as_secs(),
        Err(_) => 0,
    };

    let registry = chat.registry();
    let sessions = SessionHealthStatus {
        active_sessions: registry.session_count(),
        online_users: registry.user_count(),
        status: CheckStatus::Healthy,
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "healthy".to_string(),
            timestamp,
            version: env!("CARGO_PKG_VERSION").to_string(),
            checks: HealthChecks { sessions },
        }),
    )
}
