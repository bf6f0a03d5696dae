//! # caja-core: Pure Business Logic for Caja POS
//!
//! This crate holds the rules of the register as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Caja POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              caja-service (checkout, void, cash desk)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ caja-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌───────────┐ ┌───────────┐ ┌────────────────┐  │   │
//! │  │   │  money   │ │ promotion │ │   sale    │ │   inventory    │  │   │
//! │  │   │ quantize │ │ best unit │ │  totals   │ │ IN / OUT / ADJ │  │   │
//! │  │   │          │ │ discount  │ │ OK → VOID │ │ clamp at zero  │  │   │
//! │  │   └──────────┘ └───────────┘ └───────────┘ └────────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    caja-db (Database Layer)                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, CashSession, ...)
//! - [`money`] - Integer money and round-half-up quantization
//! - [`promotion`] - Best non-cumulative unit discount
//! - [`inventory`] - Stock movement arithmetic and stock levels
//! - [`sale`] - Drafts, totals, void transition
//! - [`preview`] - Dry-run pricing
//! - [`error`] - Domain error types
//! - [`validation`] - Field rules
//!
//! ## Example Usage
//!
//! ```rust
//! use caja_core::money::Money;
//!
//! let total = Money::from_cents(150_050).quantize();
//! assert_eq!(total.to_string(), "1501");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod inventory;
pub mod money;
pub mod preview;
pub mod promotion;
pub mod sale;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use inventory::StockLevel;
pub use money::Money;
pub use preview::{compute_preview, PreviewItem, PreviewRequestLine, SalePreview};
pub use promotion::{best_unit_discount, ActivePromotion, PromotionSet};
pub use sale::{compute_total, DraftLine, SaleDraft, ValidatedLine};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed in a single sale.
pub const MAX_SALE_LINES: usize = 100;

/// Maximum quantity on a single line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Largest amount accepted from callers: 99,999,999.99.
pub const MAX_AMOUNT_CENTS: i64 = 9_999_999_999;

/// Maximum length of sale notes, void reasons and movement reasons.
pub const MAX_NOTE_LENGTH: usize = 140;

/// Movement reason written by checkout.
pub const REASON_SALE: &str = "SALE";

/// Movement reason written by void.
pub const REASON_VOID: &str = "VOID";

/// Movement reason for a new product's opening stock.
pub const REASON_INITIAL: &str = "INITIAL";
