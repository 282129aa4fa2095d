//! API error taxonomy.
//!
//! Every handler returns `Result<_, ApiError>`; the `IntoResponse` impl maps
//! each variant to its status code and a fixed JSON body. Internal detail is
//! logged, never sent to the caller.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::event::ValidationError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed inbound webhook payload.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Audit log lookup for an unknown event id.
    #[error("log not found")]
    LogNotFound,
    /// Unexpected fault during orchestration (config source, audit store).
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::LogNotFound => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn public_message(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "Invalid webhook payload",
            ApiError::LogNotFound => "Log not found",
            ApiError::Internal(_) => "Internal server error",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            ApiError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
            }
            other => {
                tracing::warn!(%status, error = %other, "request rejected");
            }
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
