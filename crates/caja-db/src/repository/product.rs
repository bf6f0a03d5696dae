//! # Product Repository
//!
//! Database operations for the catalog.
//!
//! ## Stock Ownership
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.stock is written ONLY through the inventory ledger:           │
//! │                                                                         │
//! │  InventoryRepository::register_movement(conn, ...)                     │
//! │       └── ProductRepository::stock_for_update / set_stock (this file)  │
//! │                                                                         │
//! │  insert() always writes stock = 0; opening stock is an IN movement.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::Product;

const PRODUCT_COLUMNS: &str = "id, code, name, category_id, price_cents, stock, min_stock, \
     critical_stock, active, top_seller, created_at, updated_at";

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a product by ID on an existing connection or transaction.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(product)
    }

    /// Gets a product by business code, ignoring case.
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Loads several products at once, keyed by id.
    ///
    /// Unknown ids are simply absent from the map.
    pub async fn get_many(&self, ids: &[String]) -> DbResult<HashMap<String, Product>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_many(&mut conn, ids).await
    }

    /// [`Self::get_many`] on an existing connection or transaction.
    pub async fn find_many(
        conn: &mut SqliteConnection,
        ids: &[String],
    ) -> DbResult<HashMap<String, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let mut builder: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("));
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.clone());
        }
        separated.push_unseparated(")");

        let products: Vec<Product> = builder.build_query_as().fetch_all(conn).await?;

        Ok(products.into_iter().map(|p| (p.id.clone(), p)).collect())
    }

    /// Lists products ordered by code.
    pub async fn list(&self, active_only: bool) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE (?1 = 0 OR active = 1) ORDER BY code"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Active products at or below their reorder threshold, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products \
             WHERE active = 1 AND stock <= min_stock \
             ORDER BY stock, code"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Gets total product count.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// Inserts a new product with zero stock.
    ///
    /// ## Errors
    /// `DbError::UniqueViolation` when the code already exists in any case.
    pub async fn insert(conn: &mut SqliteConnection, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, code = %product.code, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, code, name, category_id,
                price_cents, stock, min_stock, critical_stock,
                active, top_seller, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, 0, ?6, ?7,
                ?8, ?9, ?10, ?11
            )
            "#,
        )
        .bind(&product.id)
        .bind(&product.code)
        .bind(&product.name)
        .bind(&product.category_id)
        .bind(product.price_cents)
        .bind(product.min_stock)
        .bind(product.critical_stock)
        .bind(product.active)
        .bind(product.top_seller)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(conn)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::UniqueViolation {
                field,
                value: product.code.clone(),
            },
            other => other,
        })?;

        Ok(())
    }

    /// Updates the catalog price.
    pub async fn update_price(
        conn: &mut SqliteConnection,
        id: &str,
        price_cents: i64,
    ) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET price_cents = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(price_cents)
            .bind(Utc::now())
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Toggles whether the product is sold.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE products SET active = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Reads current stock inside the ledger's transaction.
    ///
    /// The caller must already hold the write lock (see
    /// [`crate::repository::inventory`]), so the value cannot change before
    /// [`Self::set_stock`] runs.
    pub(crate) async fn stock_for_update(
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<i64>> {
        let stock: Option<i64> = sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(stock)
    }

    pub(crate) async fn set_stock(conn: &mut SqliteConnection, id: &str, stock: i64) -> DbResult<()> {
        sqlx::query("UPDATE products SET stock = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(stock)
            .bind(Utc::now())
            .execute(conn)
            .await?;

        Ok(())
    }
}
