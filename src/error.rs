// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Spatial store timeout or connection failure. Retryable by the
    /// caller; never produces a partial feature collection.
    #[error("Spatial store unavailable: {0}")]
    StoreUnavailable(String),

    /// Cache failures are never fatal: every path that sees this treats
    /// it as a miss and falls through to the store. It only reaches an
    /// HTTP response from the admin diagnostics surface.
    #[error("Cache unavailable: {0}")]
    CacheUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::StoreUnavailable(msg) => {
                tracing::warn!(error = %msg, "Spatial store unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "temporarily_unavailable",
                    Some("Fleet data is temporarily unavailable, retry shortly".to_string()),
                )
            }
            AppError::CacheUnavailable(msg) => {
                tracing::warn!(error = %msg, "Cache unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "cache_unavailable",
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
