//! Error handling module for the discussions backend.
//!
//! Provides centralized error types with mapping to HTTP status codes and response envelopes.

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

/// Error codes as constants to avoid stringly-typed errors.
pub mod codes {
    pub const MISSING_ANCHOR: &str = "MISSING_ANCHOR";
    pub const DISCUSSION_NOT_FOUND: &str = "DISCUSSION_NOT_FOUND";
    pub const PARENT_NOT_FOUND: &str = "PARENT_NOT_FOUND";
    pub const DIVISION_BY_ZERO: &str = "DIVISION_BY_ZERO";
    pub const INVALID_OPERATION_TYPE: &str = "INVALID_OPERATION_TYPE";
    pub const UNAUTHENTICATED: &str = "UNAUTHENTICATED";
    pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
    pub const CONFLICT: &str = "CONFLICT";
    pub const DATABASE_ERROR: &str = "DATABASE_ERROR";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// Neither a discussion nor a parent operation was given as anchor
    MissingAnchor,
    /// Anchor discussion does not exist
    DiscussionNotFound(String),
    /// Anchor parent operation does not exist
    ParentNotFound(String),
    /// Divide with a zero right operand
    DivisionByZero,
    /// Operator text outside add/subtract/multiply/divide
    InvalidOperationType(String),
    /// No verified caller identity
    Unauthenticated(String),
    /// Malformed input shape
    Validation(String),
    /// Unique constraint violated (e.g. username taken)
    Conflict(String),
    /// Database error
    Database(String),
    /// Internal server error
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::MissingAnchor => StatusCode::BAD_REQUEST,
            AppError::DiscussionNotFound(_) => StatusCode::NOT_FOUND,
            AppError::ParentNotFound(_) => StatusCode::NOT_FOUND,
            AppError::DivisionByZero => StatusCode::BAD_REQUEST,
            AppError::InvalidOperationType(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingAnchor => codes::MISSING_ANCHOR,
            AppError::DiscussionNotFound(_) => codes::DISCUSSION_NOT_FOUND,
            AppError::ParentNotFound(_) => codes::PARENT_NOT_FOUND,
            AppError::DivisionByZero => codes::DIVISION_BY_ZERO,
            AppError::InvalidOperationType(_) => codes::INVALID_OPERATION_TYPE,
            AppError::Unauthenticated(_) => codes::UNAUTHENTICATED,
            AppError::Validation(_) => codes::VALIDATION_FAILED,
            AppError::Conflict(_) => codes::CONFLICT,
            AppError::Database(_) => codes::DATABASE_ERROR,
            AppError::Internal(_) => codes::INTERNAL_ERROR,
        }
    }

    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            AppError::MissingAnchor => {
                "Either discussionId or parentOperationId must be provided".to_string()
            }
            AppError::DiscussionNotFound(id) => format!("Discussion {} not found", id),
            AppError::ParentNotFound(id) => format!("Parent operation {} not found", id),
            AppError::DivisionByZero => "Division by zero is not allowed".to_string(),
            AppError::InvalidOperationType(op) => format!("Invalid operation type: {}", op),
            AppError::Unauthenticated(msg) => msg.clone(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Conflict(msg) => msg.clone(),
            AppError::Database(msg) => msg.clone(),
            AppError::Internal(msg) => msg.clone(),
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error_code(), self.message())
    }
}

impl std::error::Error for AppError {}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("Database error: {:?}", err);
        AppError::Database(format!("Database error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON error: {}", err))
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        tracing::debug!("Token rejected: {}", err);
        AppError::Unauthenticated("Invalid or expired token".to_string())
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        tracing::error!("Password hashing error: {:?}", err);
        AppError::Internal("Password hashing failed".to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        tracing::error!("Blocking task failed: {:?}", err);
        AppError::Internal("Background task failed".to_string())
    }
}

/// Error details in the response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Error response envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetails,
}

impl ErrorResponse {
    pub fn new(error: &AppError) -> Self {
        let details = match error {
            AppError::DiscussionNotFound(id) => Some(serde_json::json!({ "discussionId": id })),
            AppError::ParentNotFound(id) => Some(serde_json::json!({ "parentOperationId": id })),
            _ => None,
        };

        Self {
            success: false,
            error: ErrorDetails {
                code: error.error_code().to_string(),
                message: error.message(),
                details,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse::new(&self);
        (status, Json(body)).into_response()
    }
}
