//! Error types for the visualization driver.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for driver operations.
pub type Result<T> = std::result::Result<T, VisError>;

/// Errors surfaced by the driver and its HTTP API.
#[derive(Debug, Error)]
pub enum VisError {
    /// Rejected configuration or failed run
    #[error(transparent)]
    Simulation(#[from] brigade_sim::Error),

    /// Scenario is neither a preset nor a readable file
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Malformed listen address
    #[error("Invalid address {value:?}: {source}")]
    InvalidAddr {
        value: String,
        source: std::net::AddrParseError,
    },

    /// Malformed port argument
    #[error("Invalid port {0:?}")]
    InvalidPort(String),

    /// Scenario file could not be parsed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Background run panicked or was cancelled
    #[error("Run task failed: {0}")]
    Task(String),
}

impl VisError {
    /// Short machine-readable kind for API bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            VisError::Simulation(e) => e.kind(),
            VisError::UnknownScenario(_) => "unknown_scenario",
            VisError::InvalidAddr { .. } => "invalid_address",
            VisError::InvalidPort(_) => "invalid_port",
            VisError::Serialization(_) => "serialization",
            VisError::Io(_) => "io",
            VisError::Task(_) => "task",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            VisError::Simulation(_) | VisError::UnknownScenario(_) | VisError::Serialization(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for VisError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}
