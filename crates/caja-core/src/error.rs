//! # Error Types
//!
//! Domain-specific error types for caja-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  caja-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Field-level input failures                     │
//! │                                                                         │
//! │  caja-db errors (separate crate)                                       │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  caja-service errors                                                   │
//! │  └── ServiceError     - What callers see (code + message)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError                      │
//! │        sqlx::Error → DbError → ServiceError                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
///
/// Every variant is raised before the first write of an operation, so
/// surfacing one never leaves partial state behind.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Referenced entity does not exist.
    ///
    /// ## When This Occurs
    /// - Checkout line names an unknown product
    /// - Void/close/DTE lookup with an unknown id
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Operation is not permitted in the entity's current state.
    ///
    /// ## When This Occurs
    /// - Closing a cash session that is already CLOSED
    ///
    /// Re-voiding a VOID sale is NOT reported through this variant; it is
    /// an idempotent no-op.
    #[error("{entity} {id} is {status}, cannot {operation}")]
    InvalidState {
        entity: String,
        id: String,
        status: String,
        operation: String,
    },

    /// Operation conflicts with existing data.
    ///
    /// ## When This Occurs
    /// - Deleting a category still referenced by products
    /// - Opening a cash session while another one is OPEN
    #[error("{0}")]
    Conflict(String),

    /// Sale draft has more lines than allowed.
    #[error("Sale cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Computed amount does not fit in an `i64` of hundredths.
    #[error("{field} is too large")]
    AmountOverflow { field: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates an InvalidState error.
    pub fn invalid_state(
        entity: impl Into<String>,
        id: impl Into<String>,
        status: impl Into<String>,
        operation: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            entity: entity.into(),
            id: id.into(),
            status: status.into(),
            operation: operation.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Amount is above the accepted maximum.
    #[error("{field} must be at most {max}")]
    TooLarge { field: String, max: Money },

    /// Value must be zero or greater.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., non-numeric amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., duplicate product code).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
