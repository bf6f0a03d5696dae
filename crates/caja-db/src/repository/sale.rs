//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  1. CHECKOUT (one transaction, caja-service drives it)                  │
//! │     └── insert()            → Sale { status: OK, total: 0 }            │
//! │     └── insert_item() × N   → SaleItem { discount: 0 }                 │
//! │     └── set_item_discount() × N                                        │
//! │     └── set_total()                                                    │
//! │                                                                         │
//! │  2. (OPTIONAL) VOID                                                    │
//! │     └── mark_void()         → only from OK; false when already VOID    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Write methods take `&mut SqliteConnection` so they run on the caller's
//! transaction; reads on `&self` use the pool.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::{Sale, SaleItem};

const SALE_COLUMNS: &str =
    "id, user_id, status, payment_method, total_cents, note, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, sale_id, line_no, product_id, code_snapshot, name_snapshot, \
     qty, unit_price_cents, discount_cents, created_at";

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a sale by ID on an existing connection or transaction.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1");
        let sale = sqlx::query_as::<_, Sale>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(sale)
    }

    /// Gets all items for a sale in line order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let mut conn = self.pool.acquire().await?;
        Self::items(&mut conn, sale_id).await
    }

    /// [`Self::get_items`] on an existing connection or transaction.
    pub async fn items(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM sale_items WHERE sale_id = ?1 ORDER BY line_no");
        let items = sqlx::query_as::<_, SaleItem>(&sql)
            .bind(sale_id)
            .fetch_all(conn)
            .await?;

        Ok(items)
    }

    /// Most recent sales first.
    pub async fn list_recent(&self, limit: i64) -> DbResult<Vec<Sale>> {
        let sql = format!("SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC, rowid DESC LIMIT ?1");
        let sales = sqlx::query_as::<_, Sale>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sales)
    }

    /// Inserts a sale row.
    pub async fn insert(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(id = %sale.id, user_id = %sale.user_id, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, user_id, status, payment_method,
                total_cents, note, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.user_id)
        .bind(sale.status)
        .bind(sale.payment_method)
        .bind(sale.total_cents)
        .bind(&sale.note)
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Adds an item to a sale.
    ///
    /// ## Snapshot Pattern
    /// Product code, name and unit price are copied to the sale item.
    pub async fn insert_item(conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, product_id = %item.product_id, line_no = item.line_no, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, line_no, product_id,
                code_snapshot, name_snapshot, qty,
                unit_price_cents, discount_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(item.line_no)
        .bind(&item.product_id)
        .bind(&item.code_snapshot)
        .bind(&item.name_snapshot)
        .bind(item.qty)
        .bind(item.unit_price_cents)
        .bind(item.discount_cents)
        .bind(item.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Persists a recomputed per-unit discount.
    pub async fn set_item_discount(
        conn: &mut SqliteConnection,
        item_id: &str,
        discount_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE sale_items SET discount_cents = ?2 WHERE id = ?1")
            .bind(item_id)
            .bind(discount_cents)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("SaleItem", item_id));
        }

        Ok(())
    }

    /// Stores the checkout total.
    pub async fn set_total(conn: &mut SqliteConnection, sale_id: &str, total_cents: i64) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE sales SET total_cents = ?2, updated_at = ?3 WHERE id = ?1 AND status = 'OK'",
        )
        .bind(sale_id)
        .bind(total_cents)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Sale (OK)", sale_id));
        }

        Ok(())
    }

    /// OK → VOID with the reason stored in `note`.
    ///
    /// ## Returns
    /// `false` when the sale was not OK (already voided by someone else).
    pub async fn mark_void(conn: &mut SqliteConnection, sale_id: &str, reason: &str) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = 'VOID',
                note = ?2,
                updated_at = ?3
            WHERE id = ?1 AND status = 'OK'
            "#,
        )
        .bind(sale_id)
        .bind(reason)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{insert_product, test_db};
    use caja_core::{PaymentMethod, SaleStatus};
    use uuid::Uuid;

    fn sale() -> Sale {
        Sale {
            id: Uuid::new_v4().to_string(),
            user_id: "cajero".to_string(),
            status: SaleStatus::Ok,
            payment_method: PaymentMethod::Debit,
            total_cents: 0,
            note: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item(sale: &Sale, product_id: &str, line_no: i64, unit_price_cents: i64) -> SaleItem {
        SaleItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            line_no,
            product_id: product_id.to_string(),
            code_snapshot: "A".to_string(),
            name_snapshot: "Producto A".to_string(),
            qty: 2,
            unit_price_cents,
            discount_cents: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_db().await;
        let product = insert_product(&db, "A", None, 100_000, 5).await;
        let sale = sale();

        let mut conn = db.pool().acquire().await.unwrap();
        SaleRepository::insert(&mut conn, &sale).await.unwrap();
        SaleRepository::insert_item(&mut conn, &item(&sale, &product.id, 2, 50_000))
            .await
            .unwrap();
        SaleRepository::insert_item(&mut conn, &item(&sale, &product.id, 1, 100_000))
            .await
            .unwrap();
        SaleRepository::set_total(&mut conn, &sale.id, 300_000).await.unwrap();
        drop(conn);

        let stored = db.sales().get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.payment_method, PaymentMethod::Debit);
        assert_eq!(stored.total_cents, 300_000);

        let items = db.sales().get_items(&sale.id).await.unwrap();
        assert_eq!(items.iter().map(|i| i.line_no).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_discount_above_unit_price_refused_by_storage() {
        let db = test_db().await;
        let product = insert_product(&db, "A", None, 100_000, 5).await;
        let sale = sale();
        let line = item(&sale, &product.id, 1, 1_000);

        let mut conn = db.pool().acquire().await.unwrap();
        SaleRepository::insert(&mut conn, &sale).await.unwrap();
        SaleRepository::insert_item(&mut conn, &line).await.unwrap();

        let err = SaleRepository::set_item_discount(&mut conn, &line.id, 1_001)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::CheckViolation { .. }));
    }

    #[tokio::test]
    async fn test_mark_void_only_once() {
        let db = test_db().await;
        let sale = sale();

        let mut conn = db.pool().acquire().await.unwrap();
        SaleRepository::insert(&mut conn, &sale).await.unwrap();

        assert!(SaleRepository::mark_void(&mut conn, &sale.id, "error de caja").await.unwrap());
        assert!(!SaleRepository::mark_void(&mut conn, &sale.id, "otra vez").await.unwrap());

        let stored = SaleRepository::find(&mut conn, &sale.id).await.unwrap().unwrap();
        assert_eq!(stored.status, SaleStatus::Void);
        assert_eq!(stored.note, "error de caja");
    }
}
