//! # caja-service: Business Operations for Caja POS
//!
//! Orchestrates caja-core rules over caja-db storage. Every mutating
//! operation runs in one SQLite transaction and either commits completely
//! or leaves nothing behind.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register frontend / host app                                           │
//! │       │  Pos::checkout, void, preview, open, close, ...                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 caja-service (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   SaleService   CashService   CatalogService                    │   │
//! │  │   InventoryService   DocumentService   ReportService            │   │
//! │  │                                                                 │   │
//! │  │   ServiceError { code, message }  ◄── every failure            │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                       │                                         │
//! │       ▼                       ▼                                         │
//! │   caja-core (pure rules)   caja-db (repositories, transactions)        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use caja_service::{logging, Pos, PosConfig};
//!
//! let config = PosConfig::from_env()?;
//! logging::init_tracing_with(&config.log_filter);
//!
//! let pos = Pos::connect(&config).await?;
//! let session = pos.open("50000", "cajero").await?;
//! let receipt = pos.checkout(&draft, "cajero").await?;
//! ```

pub mod cash;
pub mod catalog;
pub mod checkout;
pub mod config;
pub mod documents;
pub mod error;
pub mod inventory;
pub mod logging;
pub mod reports;

pub use cash::{CashService, CloseOutcome};
pub use catalog::{CatalogService, LowStockEntry, NewProduct, NewPromotion};
pub use checkout::{CheckoutReceipt, SaleService, VoidOutcome};
pub use config::{format_currency, ConfigError, PosConfig};
pub use documents::DocumentService;
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use inventory::{InventoryService, MovementReceipt};
pub use reports::{DaySummary, ReportService, SalesSummary};

use tracing::info;

use caja_core::{AuditLog, CashSession, PreviewRequestLine, SaleDraft, SalePreview};
use caja_db::Database;

/// Entry point for the host application.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct Pos {
    db: Database,
}

impl Pos {
    pub fn new(db: Database) -> Self {
        Pos { db }
    }

    /// Opens the configured database and applies pending migrations.
    pub async fn connect(config: &PosConfig) -> ServiceResult<Self> {
        let db = Database::new(config.db_config()).await?;

        info!(
            store = %config.store_name,
            path = %config.db_path.display(),
            "Caja POS ready"
        );

        Ok(Pos::new(db))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn sales(&self) -> SaleService {
        SaleService::new(self.db.clone())
    }

    pub fn cash(&self) -> CashService {
        CashService::new(self.db.clone())
    }

    pub fn catalog(&self) -> CatalogService {
        CatalogService::new(self.db.clone())
    }

    pub fn inventory(&self) -> InventoryService {
        InventoryService::new(self.db.clone())
    }

    pub fn documents(&self) -> DocumentService {
        DocumentService::new(self.db.clone())
    }

    pub fn reports(&self) -> ReportService {
        ReportService::new(self.db.clone())
    }

    // =========================================================================
    // Register operations
    // =========================================================================

    pub async fn checkout(&self, draft: &SaleDraft, actor: &str) -> ServiceResult<CheckoutReceipt> {
        self.sales().checkout(draft, actor).await
    }

    pub async fn void(&self, sale_id: &str, reason: &str, actor: &str) -> ServiceResult<VoidOutcome> {
        self.sales().void(sale_id, reason, actor).await
    }

    pub async fn preview(&self, lines: &[PreviewRequestLine]) -> ServiceResult<SalePreview> {
        self.sales().preview(lines).await
    }

    pub async fn open(&self, opening_amount: &str, actor: &str) -> ServiceResult<CashSession> {
        self.cash().open(opening_amount, actor).await
    }

    pub async fn close(
        &self,
        session_id: &str,
        closing_amount: Option<&str>,
        actor: &str,
    ) -> ServiceResult<CloseOutcome> {
        self.cash().close(session_id, closing_amount, actor).await
    }

    // =========================================================================
    // Audit
    // =========================================================================

    /// Newest entries first.
    pub async fn audit_log(&self, limit: i64) -> ServiceResult<Vec<AuditLog>> {
        Ok(self.db.audit().list(limit).await?)
    }

    pub async fn audit_by_actor(&self, actor: &str, limit: i64) -> ServiceResult<Vec<AuditLog>> {
        Ok(self.db.audit().list_by_actor(actor, limit).await?)
    }
}

// =============================================================================
// Test Fixtures
// =============================================================================
