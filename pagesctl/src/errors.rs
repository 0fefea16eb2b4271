use crate::db::errors::DbError;
use crate::moderation::Severity;
use crate::types::{Operation, Permission};
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// User lacks required permissions for the operation
    #[error("Insufficient permissions to {action} {resource}")]
    InsufficientPermissions {
        required: Permission,
        action: Operation,
        resource: String,
    },

    /// Subscription tier too low for the requested feature
    #[error("{message}")]
    TierRequired { message: String },

    /// Invalid request data or business rule violation
    #[error("{message}")]
    BadRequest { message: String },

    /// Form validation failure with the full ordered error/warning lists
    #[error("Validation failed")]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    /// Not enough credits for a billable operation; no remote call was made
    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits {
        required: rust_decimal::Decimal,
        available: rust_decimal::Decimal,
    },

    /// Generated or submitted content blocked by the moderation filter
    #[error("Content blocked by moderation ({severity:?}, score {score})")]
    ContentBlocked { severity: Severity, score: u32 },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Rate limit or concurrency limit exceeded
    #[error("{message}")]
    TooManyRequests {
        message: String,
        retry_after_secs: u64,
    },

    /// Upstream generation provider failed or is unreachable
    #[error("Generation service unavailable")]
    UpstreamUnavailable { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::InsufficientPermissions { .. } | Error::TierRequired { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. }
            | Error::Validation { .. }
            | Error::InsufficientCredits { .. }
            | Error::ContentBlocked { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::TooManyRequests { .. } => StatusCode::TOO_MANY_REQUESTS,
            Error::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::UniqueViolation { .. } => StatusCode::CONFLICT,
                DbError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::CheckViolation { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message
                .clone()
                .unwrap_or_else(|| "Authentication required".to_string()),
            Error::InsufficientPermissions { action, resource, .. } => {
                format!("Insufficient permissions to {action} {resource}")
            }
            Error::TierRequired { message } => message.clone(),
            Error::BadRequest { message } => message.clone(),
            Error::Validation { .. } => "Validation failed".to_string(),
            Error::InsufficientCredits { required, available } => {
                format!("Insufficient credits: {required} required, {available} available")
            }
            Error::ContentBlocked { severity, .. } => {
                format!("Content blocked by moderation filter (severity: {severity:?})")
            }
            Error::NotFound { resource, id } => {
                format!("{resource} with ID {id} not found")
            }
            Error::TooManyRequests { message, .. } => message.clone(),
            Error::UpstreamUnavailable { .. } => "Generation service unavailable".to_string(),
            Error::Internal { .. } => "Internal server error".to_string(),
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::UniqueViolation { constraint, table, .. } => {
                    match (table.as_deref(), constraint.as_deref()) {
                        (Some("users"), Some(c)) if c.contains("email") => {
                            "An account with this email address already exists".to_string()
                        }
                        (Some("chapters"), Some(c)) if c.contains("chapter_number") => {
                            "A chapter with this number already exists for the story".to_string()
                        }
                        _ => "Resource already exists".to_string(),
                    }
                }
                DbError::ForeignKeyViolation { .. } => "Invalid reference to related resource".to_string(),
                DbError::CheckViolation { constraint, .. } => match constraint.as_deref() {
                    Some(c) if c.contains("credit_balance") => "Insufficient credits".to_string(),
                    _ => "Invalid data provided".to_string(),
                },
                DbError::Other(_) => "Database error occurred".to_string(),
            },
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_)) | Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::UpstreamUnavailable { message } => {
                tracing::error!("Upstream generation failure: {}", message);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Unauthenticated { .. } | Error::InsufficientPermissions { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::TooManyRequests { .. } => {
                tracing::info!("Rate limited: {}", self);
            }
            _ => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        // All errors share a JSON body with an "error" field; some carry extras.
        match &self {
            Error::Validation { errors, warnings } => {
                let body = json!({
                    "error": "Validation failed",
                    "errors": errors,
                    "warnings": warnings,
                });
                (status, axum::response::Json(body)).into_response()
            }
            Error::TooManyRequests { retry_after_secs, .. } => {
                let body = json!({ "error": self.user_message() });
                (
                    status,
                    [(header::RETRY_AFTER, retry_after_secs.to_string())],
                    axum::response::Json(body),
                )
                    .into_response()
            }
            _ => {
                let body = json!({ "error": self.user_message() });
                (status, axum::response::Json(body)).into_response()
            }
        }
    }
}

/// Convert from String errors (e.g., from external functions)
impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Internal { operation: msg }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
