//! Application error type mapping to HTTP status codes and envelope format.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use nova_core::badge::BadgeError;
use nova_core::relay::RelayError;
use nova_types::usage::QuotaScope;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors raised by the chat relay before streaming began.
    Relay(RelayError),
    /// Errors from the badge check.
    Badge(BadgeError),
    /// Authentication failure.
    Unauthorized(String),
    /// Requested entity does not exist (or is not the caller's).
    NotFound(String),
    /// Validation error.
    Validation(String),
    /// Generic internal error.
    Internal(String),
}

impl From<RelayError> for AppError {
    fn from(e: RelayError) -> Self {
        AppError::Relay(e)
    }
}

impl From<BadgeError> for AppError {
    fn from(e: BadgeError) -> Self {
        AppError::Badge(e)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Relay(RelayError::InvalidInput(msg)) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::Relay(RelayError::QuotaExceeded {
                scope: QuotaScope::Hourly,
                limit,
            }) => (
                StatusCode::TOO_MANY_REQUESTS,
                "HOURLY_LIMIT_REACHED",
                format!("Hourly limit reached ({limit} queries). Please try again later."),
            ),
            AppError::Relay(RelayError::QuotaExceeded {
                scope: QuotaScope::Daily,
                limit,
            }) => (
                StatusCode::TOO_MANY_REQUESTS,
                "DAILY_LIMIT_REACHED",
                format!("Daily limit reached ({limit} queries). Please try again tomorrow."),
            ),
            AppError::Relay(RelayError::Gateway(e)) => {
                tracing::error!(error = %e, "model gateway call failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "GATEWAY_ERROR",
                    "The model failed to produce a response. Please try again.".to_string(),
                )
            }
            AppError::Relay(RelayError::Persistence(e)) => {
                tracing::error!(error = %e, "persistence failure before streaming");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    "Failed to record the message. Please try again.".to_string(),
                )
            }
            AppError::Badge(BadgeError::UnknownUser) => (
                StatusCode::NOT_FOUND,
                "USER_NOT_FOUND",
                "User not found".to_string(),
            ),
            AppError::Badge(BadgeError::Repository(e)) => {
                tracing::error!(error = %e, "badge check failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "BADGE_ERROR",
                    "Failed to check badges".to_string(),
                )
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg.clone()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "unexpected internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "data": null,
            "meta": {
                "request_id": "",
                "timestamp": chrono::Utc::now().to_rfc3339(),
                "response_time_ms": 0
            },
            "errors": [{
                "code": code,
                "message": message,
            }]
        });

        (
            status,
            [(axum::http::header::CONTENT_TYPE, "application/json")],
            body.to_string(),
        )
            .into_response()
    }
}
