//! Error types for the REST server.
//!
//! [`ApiError`] is what handlers return; it renders as a JSON body with a
//! status code derived from the bank error. [`ServerError`] covers starting
//! and stopping the listener.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use teller_bank::BankError;
use teller_core::LifecycleError;
use teller_tx::TxError;
use thiserror::Error;

/// Handler failure.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A bank unit of work failed.
    #[error(transparent)]
    Bank(#[from] BankError),

    /// The blocking task running the unit of work died.
    #[error("worker task failed: {0}")]
    Worker(String),
}

impl ApiError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Bank(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Bank(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            Self::Bank(BankError::ConcurrentModification { .. }) => StatusCode::CONFLICT,
            Self::Bank(BankError::Tx(TxError::ConnectionAcquisition(_))) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            Self::Bank(_) | Self::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self.status() {
            StatusCode::BAD_REQUEST => "invalid_request",
            StatusCode::NOT_FOUND => "not_found",
            StatusCode::CONFLICT => "conflict",
            StatusCode::SERVICE_UNAVAILABLE => "unavailable",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "an internal error occurred".to_string()
        } else {
            self.to_string()
        };
        let body = json!({
            "error": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

/// Listener start/stop failure.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Invalid lifecycle transition.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Binding or inspecting the listener failed.
    #[error("listener error: {0}")]
    Io(#[from] std::io::Error),

    /// `local_addr` was asked of a server that is not running.
    #[error("server is not running")]
    NotRunning,
}

/// Convenience type alias for server results.
pub type Result<T> = std::result::Result<T, ServerError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
