//! # Inventory Ledger
//!
//! Append-only stock movements and the stock update they imply.
//!
//! ## Write Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  register_movement(conn, product, kind, qty, reason)                   │
//! │                                                                         │
//! │  1. INSERT movement ... SELECT FROM products WHERE id = ?              │
//! │       └── first write: transaction now holds the SQLite write lock     │
//! │       └── 0 rows → product unknown → NotFound                          │
//! │  2. SELECT stock                    (nobody else can write now)        │
//! │  3. MovementType::apply(stock, qty) (pure, clamps at 0)                │
//! │  4. UPDATE products SET stock                                          │
//! │                                                                         │
//! │  All four run on the caller's connection and commit together.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::ProductRepository;
use caja_core::{InventoryMovement, MovementType};

const MOVEMENT_COLUMNS: &str = "id, product_id, kind, qty, reason, created_at";

/// Repository for the inventory ledger.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    /// Creates a new InventoryRepository.
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    /// Records a movement and applies it to the product's stock.
    ///
    /// Runs on the caller's transaction; nothing is committed here.
    ///
    /// ## Errors
    /// `DbError::NotFound` when the product does not exist. The caller's
    /// transaction should then be dropped.
    pub async fn register_movement(
        conn: &mut SqliteConnection,
        product_id: &str,
        kind: MovementType,
        qty: i64,
        reason: &str,
    ) -> DbResult<InventoryMovement> {
        let movement = InventoryMovement {
            id: Uuid::new_v4().to_string(),
            product_id: product_id.to_string(),
            kind,
            qty,
            reason: reason.to_string(),
            created_at: Utc::now(),
        };

        let inserted = sqlx::query(
            r#"
            INSERT INTO inventory_movements (id, product_id, kind, qty, reason, created_at)
            SELECT ?1, id, ?3, ?4, ?5, ?6 FROM products WHERE id = ?2
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.product_id)
        .bind(movement.kind)
        .bind(movement.qty)
        .bind(&movement.reason)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        if inserted.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product_id));
        }

        let stock = ProductRepository::stock_for_update(&mut *conn, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;

        let next = kind.apply(stock, qty);
        ProductRepository::set_stock(&mut *conn, product_id, next).await?;

        debug!(
            product_id = %product_id,
            kind = kind.as_str(),
            qty,
            from = stock,
            to = next,
            reason = %reason,
            "Registered inventory movement"
        );

        Ok(movement)
    }

    /// Movements of one product, newest first.
    pub async fn movements_for(&self, product_id: &str, limit: i64) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             WHERE product_id = ?1 ORDER BY created_at DESC, rowid DESC LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(product_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// All movements, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM inventory_movements \
             ORDER BY created_at DESC, rowid DESC LIMIT ?1"
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }
}
