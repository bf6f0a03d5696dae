//! # Sale Aggregate
//!
//! Drafts, totals and the OK → VOID transition.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SaleDraft (caller input, no side effects)                              │
//! │       │  validate() ← every rule checked before the first write        │
//! │       ▼                                                                 │
//! │  Sale { status: OK } + SaleItems { discount: 0 }                       │
//! │       │  promotions applied during checkout                            │
//! │       ▼                                                                 │
//! │  compute_total() → stored once, authoritative afterwards               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  void(reason) → VOID (terminal, total untouched)                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{PaymentMethod, Sale, SaleItem, SaleStatus};
use crate::validation::{validate_amount, validate_note, validate_quantity};
use crate::MAX_SALE_LINES;

// =============================================================================
// Draft
// =============================================================================

/// A sale as submitted by the register, before checkout.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleDraft {
    #[serde(default)]
    pub payment_method: PaymentMethod,

    #[serde(default)]
    pub note: String,

    pub items: Vec<DraftLine>,
}

/// One requested line.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DraftLine {
    pub product_id: String,
    pub qty: i64,

    /// Decimal string; the catalog price is used when absent.
    #[serde(default)]
    pub unit_price: Option<String>,
}

/// A draft line that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    pub product_id: String,
    pub qty: i64,
    pub unit_price: Option<Money>,
}

impl SaleDraft {
    /// Checks every field rule and parses unit prices.
    ///
    /// Product existence is not checked here; that needs the catalog.
    pub fn validate(&self) -> CoreResult<Vec<ValidatedLine>> {
        if self.items.is_empty() {
            return Err(ValidationError::Required {
                field: "items".to_string(),
            }
            .into());
        }

        if self.items.len() > MAX_SALE_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_SALE_LINES,
            });
        }

        validate_note("note", &self.note)?;

        self.items
            .iter()
            .map(|line| -> CoreResult<ValidatedLine> {
                if line.product_id.trim().is_empty() {
                    return Err(ValidationError::Required {
                        field: "product_id".to_string(),
                    }
                    .into());
                }

                validate_quantity(line.qty)?;

                let unit_price = match line.unit_price.as_deref() {
                    Some(raw) => {
                        let price = Money::parse_decimal(raw, "unit_price")?;
                        validate_amount("unit_price", price)?;
                        Some(price)
                    }
                    None => None,
                };

                Ok(ValidatedLine {
                    product_id: line.product_id.trim().to_string(),
                    qty: line.qty,
                    unit_price,
                })
            })
            .collect()
    }
}

// =============================================================================
// Totals
// =============================================================================

impl SaleItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn discount(&self) -> Money {
        Money::from_cents(self.discount_cents)
    }

    /// `(unit_price - discount) × qty`, unrounded. `None` on overflow.
    pub fn net_line(&self) -> Option<Money> {
        (self.unit_price() - self.discount()).multiply_quantity(self.qty)
    }
}

/// `quantize(Σ (unit_price − discount) × qty)` over the items.
///
/// Overflow is reported as [`CoreError::AmountOverflow`].
pub fn compute_total(items: &[SaleItem]) -> CoreResult<Money> {
    items
        .iter()
        .try_fold(Money::zero(), |acc, item| {
            item.net_line().and_then(|net| acc.checked_add(net))
        })
        .map(Money::quantize)
        .ok_or_else(|| CoreError::AmountOverflow {
            field: "total".to_string(),
        })
}

// =============================================================================
// Transitions
// =============================================================================

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_void(&self) -> bool {
        self.status == SaleStatus::Void
    }

    /// Moves the sale to VOID and records the reason in `note`.
    ///
    /// Returns `false` without touching anything when already VOID.
    pub fn void(&mut self, reason: &str) -> bool {
        if self.is_void() {
            return false;
        }

        self.status = SaleStatus::Void;
        self.note = reason.to_string();
        self.updated_at = Utc::now();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(unit_cents: i64, discount_cents: i64, qty: i64) -> SaleItem {
        SaleItem {
            id: "i".to_string(),
            sale_id: "s".to_string(),
            line_no: 1,
            product_id: "p".to_string(),
            code_snapshot: "P".to_string(),
            name_snapshot: "Prod".to_string(),
            qty,
            unit_price_cents: unit_cents,
            discount_cents,
            created_at: Utc::now(),
        }
    }

    fn draft(lines: Vec<DraftLine>) -> SaleDraft {
        SaleDraft {
            payment_method: PaymentMethod::Cash,
            note: String::new(),
            items: lines,
        }
    }

    fn line(product: &str, qty: i64, price: Option<&str>) -> DraftLine {
        DraftLine {
            product_id: product.to_string(),
            qty,
            unit_price: price.map(str::to_string),
        }
    }

    #[test]
    fn test_compute_total() {
        let items = vec![item(100_000, 10_000, 2), item(50_000, 0, 1)];
        assert_eq!(compute_total(&items).unwrap(), Money::from_units(2300));
    }

    #[test]
    fn test_compute_total_quantizes_once() {
        // 3 × 0.50 = 1.50 → 2 (not 3 × quantize(0.50) = 3)
        let items = vec![item(50, 0, 3)];
        assert_eq!(compute_total(&items).unwrap(), Money::from_units(2));
    }

    #[test]
    fn test_compute_total_empty() {
        assert_eq!(compute_total(&[]).unwrap(), Money::zero());
    }

    #[test]
    fn test_compute_total_overflow_is_an_error() {
        let items = vec![item(1_000_000_000_000_000_000, 0, 10)];
        assert!(matches!(
            compute_total(&items),
            Err(CoreError::AmountOverflow { .. })
        ));

        let items = vec![item(i64::MAX, 0, 1), item(i64::MAX, 0, 1)];
        assert!(compute_total(&items).is_err());
    }

    #[test]
    fn test_void_is_one_way() {
        let mut sale = Sale {
            id: "s".to_string(),
            user_id: "u".to_string(),
            status: SaleStatus::Ok,
            payment_method: PaymentMethod::Cash,
            total_cents: 100_000,
            note: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert!(sale.void("customer changed mind"));
        assert!(sale.is_void());
        assert_eq!(sale.note, "customer changed mind");
        assert_eq!(sale.total(), Money::from_units(1000));

        assert!(!sale.void("again"));
        assert_eq!(sale.note, "customer changed mind");
    }

    #[test]
    fn test_validate_draft() {
        let lines = draft(vec![line("a", 2, None), line(" b ", 1, Some("999.50"))])
            .validate()
            .unwrap();

        assert_eq!(lines[0].unit_price, None);
        assert_eq!(lines[1].product_id, "b");
        assert_eq!(lines[1].unit_price, Some(Money::from_cents(99_950)));
    }

    #[test]
    fn test_validate_draft_rejects_bad_input() {
        assert!(draft(vec![]).validate().is_err());
        assert!(draft(vec![line("a", 0, None)]).validate().is_err());
        assert!(draft(vec![line("a", 1000, None)]).validate().is_err());
        assert!(draft(vec![line("", 1, None)]).validate().is_err());
        assert!(draft(vec![line("a", 1, Some("-5"))]).validate().is_err());
        assert!(draft(vec![line("a", 1, Some("diez"))]).validate().is_err());
        assert!(matches!(
            draft(vec![line("a", 10, Some("10000000000000000"))]).validate(),
            Err(CoreError::Validation(ValidationError::TooLarge { .. }))
        ));
        assert!(draft(vec![line("a", 1, Some("99999999.99"))]).validate().is_ok());

        let mut long_note = draft(vec![line("a", 1, None)]);
        long_note.note = "x".repeat(141);
        assert!(long_note.validate().is_err());

        let too_many = draft((0..101).map(|_| line("a", 1, None)).collect());
        assert!(matches!(
            too_many.validate(),
            Err(CoreError::CartTooLarge { max: 100 })
        ));
    }
}
