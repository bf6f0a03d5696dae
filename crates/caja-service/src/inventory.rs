//! # Inventory Service
//!
//! Manual stock movements through the ledger, plus the read side.

use serde::Serialize;
use serde_json::json;
use tracing::info;
use ts_rs::TS;

use caja_core::validation::{validate_name, validate_note};
use caja_core::{
    AuditAction, InventoryMovement, MovementType, StockLevel, ValidationError, MAX_NOTE_LENGTH,
};
use caja_db::{AuditRepository, Database, InventoryRepository, ProductRepository};

use crate::error::{ServiceError, ServiceResult};

/// A registered movement and the stock it left behind.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct MovementReceipt {
    pub movement: InventoryMovement,
    pub stock: i64,
    pub level: StockLevel,
}

#[derive(Debug, Clone)]
pub struct InventoryService {
    db: Database,
}

impl InventoryService {
    pub fn new(db: Database) -> Self {
        InventoryService { db }
    }

    /// Registers a manual movement, audited as `STOCK_ADJUST`.
    ///
    /// IN and OUT take a positive quantity; ADJ takes any non-zero signed
    /// quantity. OUT and negative ADJ clamp at zero.
    pub async fn register(
        &self,
        product_id: &str,
        kind: MovementType,
        qty: i64,
        reason: &str,
        actor: &str,
    ) -> ServiceResult<MovementReceipt> {
        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        validate_name("reason", reason, MAX_NOTE_LENGTH)?;
        validate_note("reason", reason)?;
        match kind {
            MovementType::In | MovementType::Out if qty <= 0 => {
                return Err(ValidationError::MustBePositive {
                    field: "qty".to_string(),
                }
                .into());
            }
            MovementType::Adj if qty == 0 => {
                return Err(ValidationError::Required {
                    field: "qty".to_string(),
                }
                .into());
            }
            _ => {}
        }

        let mut tx = self.db.begin().await?;

        let movement =
            InventoryRepository::register_movement(&mut tx, product_id, kind, qty, reason.trim())
                .await?;
        let product = ProductRepository::find(&mut tx, product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::StockAdjust,
            "Product",
            product_id,
            &json!({
                "movement": [kind.as_str(), qty],
                "stock": [null, product.stock],
            }),
        )
        .await?;

        tx.commit().await?;

        info!(
            product_id = %product_id,
            kind = kind.as_str(),
            qty,
            stock = product.stock,
            actor = %actor,
            "Stock movement registered"
        );

        Ok(MovementReceipt {
            movement,
            level: product.stock_level(),
            stock: product.stock,
        })
    }

    /// Movements of one product, newest first.
    pub async fn movements(&self, product_id: &str, limit: i64) -> ServiceResult<Vec<InventoryMovement>> {
        Ok(self.db.inventory().movements_for(product_id, limit).await?)
    }

    /// All movements, newest first.
    pub async fn list(&self, limit: i64) -> ServiceResult<Vec<InventoryMovement>> {
        Ok(self.db.inventory().list(limit).await?)
    }

    pub async fn stock_level(&self, product_id: &str) -> ServiceResult<StockLevel> {
        let product = self
            .db
            .products()
            .get_by_id(product_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", product_id))?;

        Ok(product.stock_level())
    }
}
