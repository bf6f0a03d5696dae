//! # Repository Module
//!
//! Database repository implementations for Caja POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways In                                          │
//! │                                                                         │
//! │  Reads:   db.products().get_by_id(id)         &self, uses the pool     │
//! │                                                                         │
//! │  Writes:  let mut tx = db.begin().await?;                              │
//! │           SaleRepository::insert(&mut tx, &sale).await?;               │
//! │           InventoryRepository::register_movement(&mut tx, ...).await?; │
//! │           tx.commit().await?;                                          │
//! │                                                                         │
//! │  Write functions take `&mut SqliteConnection` so several repositories  │
//! │  share one transaction.                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`category::CategoryRepository`] - Categories
//! - [`product::ProductRepository`] - Catalog
//! - [`promotion::PromotionRepository`] - Promotions and the active set
//! - [`sale::SaleRepository`] - Sales and sale items
//! - [`inventory::InventoryRepository`] - Stock ledger
//! - [`cash_session::CashSessionRepository`] - Register sessions
//! - [`audit::AuditRepository`] - Audit trail
//! - [`document::DocumentRepository`] - Tax documents (DTE)
//! - [`report::ReportRepository`] - Aggregates

pub mod audit;
pub mod cash_session;
pub mod category;
pub mod document;
pub mod inventory;
pub mod product;
pub mod promotion;
pub mod report;
pub mod sale;
