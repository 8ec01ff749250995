//! `/health` endpoint.

use serde::Serialize;
use std::time::Instant;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is answering.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Whether the transactor is settling orders.
    pub transactor_running: bool,
}

/// Build a health response.
pub fn health_check(start_time: Instant, transactor_running: bool) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        transactor_running,
    }
}
