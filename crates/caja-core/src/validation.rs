//! # Validation Module
//!
//! Input validation utilities for Caja POS.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: caja-service                                                 │
//! │  ├── Deserialized DTOs                                                 │
//! │  └── THIS MODULE: field rules, run before the first write              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Database (SQLite)                                            │
//! │  ├── CHECK constraints (stock >= 0, discount <= unit price)            │
//! │  ├── UNIQUE constraints (product code, single OPEN session)            │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::money::{Money, FULL_PERCENT_BPS};
use crate::types::PromotionKind;
use crate::{MAX_AMOUNT_CENTS, MAX_ITEM_QUANTITY, MAX_NOTE_LENGTH};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - Letters, numbers, hyphens, underscores and dots only
///
/// ```rust
/// use caja_core::validation::validate_code;
///
/// assert!(validate_code("BEB-001").is_ok());
/// assert!(validate_code("").is_err());
/// assert!(validate_code("has space").is_err());
/// ```
pub fn validate_code(code: &str) -> ValidationResult<()> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "code".to_string(),
        });
    }

    if code.chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "code".to_string(),
            max: 50,
        });
    }

    if !code
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_' || c == '.')
    {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must contain only letters, numbers, hyphens, underscores, and dots"
                .to_string(),
        });
    }

    Ok(())
}

/// Validates a required display name with a maximum length.
pub fn validate_name(field: &str, name: &str, max: usize) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(())
}

/// Validates a free-text note (sale note, void reason, movement reason).
pub fn validate_note(field: &str, note: &str) -> ValidationResult<()> {
    if note.chars().count() > MAX_NOTE_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NOTE_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (999)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "qty".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "qty".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a caller-supplied amount: `0 <= amount <= 99,999,999.99`.
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::TooLarge {
            field: field.to_string(),
            max: Money::from_cents(MAX_AMOUNT_CENTS),
        });
    }

    Ok(())
}

/// Validates stock thresholds: both non-negative, `critical <= min`.
pub fn validate_stock_thresholds(min_stock: i64, critical_stock: i64) -> ValidationResult<()> {
    if min_stock < 0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "min_stock".to_string(),
        });
    }

    if critical_stock < 0 || critical_stock > min_stock {
        return Err(ValidationError::OutOfRange {
            field: "critical_stock".to_string(),
            min: 0,
            max: min_stock,
        });
    }

    Ok(())
}

/// Validates a promotion value in hundredths.
///
/// ## Rules
/// - PERCENT: 0 to 10000 basis points (0% to 100%)
/// - FIXED: any accepted amount (see [`validate_amount`])
pub fn validate_promotion_value(kind: PromotionKind, value: i64) -> ValidationResult<()> {
    match kind {
        PromotionKind::Percent if !(0..=FULL_PERCENT_BPS).contains(&value) => {
            Err(ValidationError::OutOfRange {
                field: "value".to_string(),
                min: 0,
                max: 100,
            })
        }
        PromotionKind::Fixed => validate_amount("value", Money::from_cents(value)),
        PromotionKind::Percent => Ok(()),
    }
}

// =============================================================================
// Amount Parsing
// =============================================================================

/// Parses a caller-supplied, non-negative decimal amount.
///
/// ## Rejections
/// ```text
/// None / "" / "  "   → Required
/// "abc"              → InvalidFormat
/// "-1"               → MustNotBeNegative
/// "100000000"        → TooLarge
/// ```
///
/// ```rust
/// use caja_core::validation::parse_amount;
/// use caja_core::Money;
///
/// assert_eq!(parse_amount(Some("4800"), "closing_amount").unwrap(), Money::from_units(4800));
/// assert!(parse_amount(Some(""), "closing_amount").is_err());
/// assert!(parse_amount(None, "closing_amount").is_err());
/// ```
pub fn parse_amount(raw: Option<&str>, field: &str) -> ValidationResult<Money> {
    let raw = raw.ok_or_else(|| ValidationError::Required {
        field: field.to_string(),
    })?;

    let amount = Money::parse_decimal(raw, field)?;
    validate_amount(field, amount)?;

    Ok(amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
