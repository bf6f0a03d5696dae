//! # Service Error Type
//!
//! What callers of [`crate::Pos`] see when an operation fails.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                     │
//! │                                   ├──► ServiceError { code, message }   │
//! │  sqlx::Error ──────► DbError ─────┘                                     │
//! │                                                                         │
//! │  VALIDATION_ERROR   bad input, nothing written                          │
//! │  INVALID_STATE      e.g. closing a CLOSED cash session                  │
//! │  NOT_FOUND          product, sale, cash session, DTE                    │
//! │  CONFLICT           duplicate code, category in use, second open session│
//! │  INTERNAL           integrity failure, rolled back, logged              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Internal failures are logged with `tracing::error!` and replaced by a
//! generic message; SQL text never reaches the caller.

use serde::Serialize;
use thiserror::Error;
use ts_rs::TS;

use caja_core::{CoreError, ValidationError};
use caja_db::DbError;

/// Error returned by every service operation.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INVALID_STATE",
///   "message": "CashSession 6f1c... is CLOSED, cannot close"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error, TS)]
#[ts(export)]
#[error("[{code:?}] {message}")]
pub struct ServiceError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Input failed validation (400)
    ValidationError,

    /// Operation not allowed in the current state (409)
    InvalidState,

    /// Resource not found (404)
    NotFound,

    /// Conflicts with existing data (409)
    Conflict,

    /// Integrity or infrastructure failure (500)
    Internal,
}

impl ServiceError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ServiceError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ServiceError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        ServiceError::new(ErrorCode::Conflict, message)
    }

    /// Creates an internal error with a generic message.
    pub fn internal() -> Self {
        ServiceError::new(ErrorCode::Internal, "Internal error, operation rolled back")
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => {
                ServiceError::conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::warn!("Foreign key violation: {}", message);
                ServiceError::conflict("Record is referenced by other records")
            }
            DbError::CheckViolation { message } => {
                tracing::error!("Check constraint failed: {}", message);
                ServiceError::internal()
            }
            DbError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ServiceError::internal()
            }
            DbError::MigrationFailed(e) => {
                tracing::error!("Database migration failed: {}", e);
                ServiceError::internal()
            }
            DbError::QueryFailed(e) => {
                tracing::error!("Database query failed: {}", e);
                ServiceError::internal()
            }
            DbError::PoolExhausted => {
                tracing::error!("Database pool exhausted");
                ServiceError::internal()
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ServiceError::internal()
            }
        }
    }
}

/// Transaction begin/commit failures surface as raw sqlx errors.
impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::from(DbError::from(err))
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound { entity, id } => ServiceError::not_found(&entity, &id),
            e @ CoreError::InvalidState { .. } => {
                ServiceError::new(ErrorCode::InvalidState, e.to_string())
            }
            CoreError::Conflict(message) => ServiceError::conflict(message),
            e @ (CoreError::CartTooLarge { .. } | CoreError::AmountOverflow { .. }) => {
                ServiceError::new(ErrorCode::ValidationError, e.to_string())
            }
            CoreError::Validation(e) => ServiceError::from(e),
        }
    }
}

impl From<ValidationError> for ServiceError {
    fn from(err: ValidationError) -> Self {
        ServiceError::new(ErrorCode::ValidationError, err.to_string())
    }
}

/// Result type for service operations.
pub type ServiceResult<T> = Result<T, ServiceError>;
