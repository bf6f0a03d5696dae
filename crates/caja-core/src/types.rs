//! # Domain Types
//!
//! Core domain types used throughout Caja POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Category ◄──── Product ◄──── SaleItem ────► Sale ────► TaxDocument    │
//! │     ▲              ▲                           (1:1)                    │
//! │     │              │                                                    │
//! │  Promotion ────────┘ (explicit members)                                │
//! │                    ▲                                                    │
//! │                    │                                                    │
//! │          InventoryMovement (append-only)                               │
//! │                                                                         │
//! │  CashSession (independent)      AuditLog (append-only)                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: product `code`, category `name`
//!
//! Monetary columns are `*_cents` (hundredths). See [`crate::money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A product available for sale.
///
/// `stock` is owned by the inventory ledger; nothing else writes it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Business code, unique ignoring case.
    pub code: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    pub category_id: Option<String>,

    /// Catalog unit price in hundredths.
    pub price_cents: i64,

    /// Units on hand, never negative.
    pub stock: i64,

    /// Reorder threshold.
    pub min_stock: i64,

    /// Critical threshold, at most `min_stock`.
    pub critical_stock: i64,

    /// Inactive products are hidden from the register but keep their history.
    pub active: bool,

    pub top_seller: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the catalog price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

// =============================================================================
// Promotions
// =============================================================================

/// How a promotion's `value` is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PromotionKind {
    /// `value` is a percentage in basis points (1000 = 10.00%).
    Percent,
    /// `value` is a fixed unit discount in hundredths.
    Fixed,
}

/// A promotional discount rule.
///
/// A promotion applies to a product when the product's category matches
/// `category_id` OR the product is one of the promotion's explicit members.
/// Members are resolved separately (see [`crate::promotion::PromotionSet`]).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Promotion {
    pub id: String,
    pub name: String,

    #[serde(rename = "type")]
    pub kind: PromotionKind,

    /// Hundredths: basis points for PERCENT, cents for FIXED.
    pub value: i64,

    pub active: bool,
    pub category_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Sales
// =============================================================================

/// The status of a sale.
///
/// ```text
/// OK ──void()──► VOID   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Ok,
    Void,
}

impl SaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Ok => "OK",
            SaleStatus::Void => "VOID",
        }
    }
}

/// Payment method recorded on the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Debit,
    Credit,
    Transfer,
}

/// A completed (or voided) sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,

    /// Cashier who rang up the sale.
    pub user_id: String,

    pub status: SaleStatus,
    pub payment_method: PaymentMethod,

    /// Authoritative total, set once at checkout.
    pub total_cents: i64,

    /// Free text; holds the reason once voided.
    pub note: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A line item in a sale.
///
/// ## Snapshot Pattern
/// Code, name and unit price are copied from the product at sale time so
/// receipts stay correct after catalog edits.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,

    /// Insertion order within the sale, starting at 1.
    pub line_no: i64,

    pub product_id: String,
    pub code_snapshot: String,
    pub name_snapshot: String,
    pub qty: i64,
    pub unit_price_cents: i64,

    /// Per-unit discount, `0 <= discount <= unit_price`.
    pub discount_cents: i64,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory
// =============================================================================

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MovementType {
    /// Stock received or returned.
    In,
    /// Stock sold or removed, clamped at zero.
    Out,
    /// Signed correction, clamped at zero.
    Adj,
}

/// An immutable stock movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: String,
    pub product_id: String,

    #[serde(rename = "type")]
    pub kind: MovementType,

    /// Magnitude for IN/OUT, signed for ADJ.
    pub qty: i64,

    pub reason: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Desk
// =============================================================================

/// Status of a cash-register session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CashSessionStatus {
    Open,
    Closed,
}

impl CashSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashSessionStatus::Open => "OPEN",
            CashSessionStatus::Closed => "CLOSED",
        }
    }
}

/// A register session from opening float to closing count.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CashSession {
    pub id: String,
    pub status: CashSessionStatus,
    pub opened_by: String,
    pub closed_by: Option<String>,
    pub opening_amount_cents: i64,
    pub closing_amount_cents: Option<i64>,

    /// `closing - opening`, set at close.
    pub diff_cents: Option<i64>,

    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,

    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
}

impl CashSession {
    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == CashSessionStatus::Open
    }

    #[inline]
    pub fn opening_amount(&self) -> Money {
        Money::from_cents(self.opening_amount_cents)
    }
}

// =============================================================================
// Audit
// =============================================================================

/// Audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    SaleCheckout,
    SaleVoid,
    PriceChange,
    CashOpen,
    CashClose,
    StockAdjust,
    DteResult,
}

/// An immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditLog {
    pub id: String,
    pub actor: String,
    pub action: AuditAction,

    /// Entity name, e.g. `"Sale"`.
    pub model: String,
    pub obj_id: String,

    /// JSON object mapping field → `[before, after]` (or a bare value).
    pub changes: String,

    #[ts(as = "String")]
    pub ts: DateTime<Utc>,
}

impl AuditLog {
    /// Parses `changes`; malformed JSON yields `Null`.
    pub fn changes_json(&self) -> serde_json::Value {
        serde_json::from_str(&self.changes).unwrap_or(serde_json::Value::Null)
    }
}

// =============================================================================
// Tax Documents
// =============================================================================

/// Fiscal-authority status of a DTE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "SCREAMING_SNAKE_CASE"))]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    Pending,
    Sent,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Pending => "PENDING",
            DocumentStatus::Sent => "SENT",
            DocumentStatus::Rejected => "REJECTED",
        }
    }

    /// Parses a caller-supplied status (case-insensitive).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Some(DocumentStatus::Pending),
            "SENT" => Some(DocumentStatus::Sent),
            "REJECTED" => Some(DocumentStatus::Rejected),
            _ => None,
        }
    }
}

/// Tax document (DTE), one per sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TaxDocument {
    pub id: String,
    pub sale_id: String,
    pub status: DocumentStatus,
    pub external_id: String,
    pub message: String,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
