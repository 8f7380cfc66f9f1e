//! Error envelope for report endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use pulse_core::PulseError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Body of every non-2xx response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors surfaced to API callers
#[derive(Debug, Error)]
pub enum ReportError {
    /// Malformed or unknown input
    #[error("{0}")]
    BadRequest(String),

    /// Engine or store failure; details stay in the logs
    #[error("{0}")]
    Internal(String),
}

impl ReportError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PulseError> for ReportError {
    fn from(e: PulseError) -> Self {
        match e {
            PulseError::Validation { message } => Self::BadRequest(message),
            PulseError::NotFound { resource } => Self::BadRequest(format!("{} not found", resource)),
            other => {
                error!(category = %other.category(), "Report failed: {}", other);
                Self::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ReportError::BadRequest(msg) => msg,
            ReportError::Internal(_) => "Internal server error".to_string(),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}
