//! # Promotion Repository
//!
//! Loads the active promotion set in two queries and stores promotions with
//! their explicit product members.
//!
//! ```text
//! load_active()
//!   ├── SELECT ... FROM promotions WHERE active = 1
//!   └── SELECT promotion_id, product_id FROM promotion_products (active only)
//!         └── grouped into one HashSet<product_id> per promotion
//! ```

use std::collections::{HashMap, HashSet};

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use caja_core::{ActivePromotion, Promotion, PromotionSet};

const PROMOTION_COLUMNS: &str = "id, name, kind, value, active, category_id, created_at";

/// Repository for promotion database operations.
#[derive(Debug, Clone)]
pub struct PromotionRepository {
    pool: SqlitePool,
}

impl PromotionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PromotionRepository { pool }
    }

    /// Loads every active promotion with its member set resolved.
    pub async fn load_active(&self) -> DbResult<PromotionSet> {
        let mut conn = self.pool.acquire().await?;
        Self::load_active_in(&mut conn).await
    }

    /// [`Self::load_active`] on an existing connection or transaction.
    pub async fn load_active_in(conn: &mut SqliteConnection) -> DbResult<PromotionSet> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE active = 1 ORDER BY created_at");
        let promotions = sqlx::query_as::<_, Promotion>(&sql)
            .fetch_all(&mut *conn)
            .await?;

        if promotions.is_empty() {
            return Ok(PromotionSet::empty());
        }

        let memberships: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT pp.promotion_id, pp.product_id
            FROM promotion_products pp
            JOIN promotions p ON p.id = pp.promotion_id
            WHERE p.active = 1
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut members: HashMap<String, HashSet<String>> = HashMap::new();
        for (promotion_id, product_id) in memberships {
            members.entry(promotion_id).or_default().insert(product_id);
        }

        debug!(count = promotions.len(), "Loaded active promotions");

        Ok(PromotionSet::new(
            promotions
                .into_iter()
                .map(|promo| {
                    let product_ids = members.remove(&promo.id).unwrap_or_default();
                    ActivePromotion::new(promo, product_ids)
                })
                .collect(),
        ))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions WHERE id = ?1");
        let promotion = sqlx::query_as::<_, Promotion>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(promotion)
    }

    /// Lists all promotions, newest first.
    pub async fn list(&self) -> DbResult<Vec<Promotion>> {
        let sql = format!("SELECT {PROMOTION_COLUMNS} FROM promotions ORDER BY created_at DESC");
        let promotions = sqlx::query_as::<_, Promotion>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(promotions)
    }

    /// Explicit product members of a promotion.
    pub async fn product_ids(&self, id: &str) -> DbResult<HashSet<String>> {
        let ids: Vec<String> =
            sqlx::query_scalar("SELECT product_id FROM promotion_products WHERE promotion_id = ?1")
                .bind(id)
                .fetch_all(&self.pool)
                .await?;

        Ok(ids.into_iter().collect())
    }

    /// Inserts a promotion and its explicit members.
    pub async fn insert(
        conn: &mut SqliteConnection,
        promotion: &Promotion,
        product_ids: &HashSet<String>,
    ) -> DbResult<()> {
        debug!(id = %promotion.id, kind = ?promotion.kind, value = promotion.value, "Inserting promotion");

        sqlx::query(
            r#"
            INSERT INTO promotions (id, name, kind, value, active, category_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&promotion.id)
        .bind(&promotion.name)
        .bind(promotion.kind)
        .bind(promotion.value)
        .bind(promotion.active)
        .bind(&promotion.category_id)
        .bind(promotion.created_at)
        .execute(&mut *conn)
        .await?;

        for product_id in product_ids {
            sqlx::query("INSERT INTO promotion_products (promotion_id, product_id) VALUES (?1, ?2)")
                .bind(&promotion.id)
                .bind(product_id)
                .execute(&mut *conn)
                .await?;
        }

        Ok(())
    }

    /// Activates or deactivates a promotion.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE promotions SET active = ?2 WHERE id = ?1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Promotion", id));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{insert_product, insert_promotion, test_db};
    use caja_core::{Money, PromotionKind};

    #[tokio::test]
    async fn test_load_active_resolves_members() {
        let db = test_db().await;
        let category = db.categories().create("Bebidas").await.unwrap();
        let a = insert_product(&db, "A", Some(&category.id), 100_000, 5).await;
        let b = insert_product(&db, "B", None, 100_000, 5).await;

        insert_promotion(&db, PromotionKind::Percent, 1000, Some(&category.id), &[]).await;
        insert_promotion(&db, PromotionKind::Fixed, 15_000, None, &[&b.id]).await;

        let set = db.promotions().load_active().await.unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.best_unit_discount(&a, a.price()), Money::from_units(100));
        assert_eq!(set.best_unit_discount(&b, b.price()), Money::from_units(150));
    }

    #[tokio::test]
    async fn test_inactive_promotions_not_loaded() {
        let db = test_db().await;
        let a = insert_product(&db, "A", None, 100_000, 5).await;
        let promo = insert_promotion(&db, PromotionKind::Fixed, 15_000, None, &[&a.id]).await;

        db.promotions().set_active(&promo.id, false).await.unwrap();

        let set = db.promotions().load_active().await.unwrap();
        assert!(set.is_empty());
        assert_eq!(set.best_unit_discount(&a, a.price()), Money::zero());
    }

    #[tokio::test]
    async fn test_product_ids_round_trip() {
        let db = test_db().await;
        let a = insert_product(&db, "A", None, 100_000, 5).await;
        let b = insert_product(&db, "B", None, 100_000, 5).await;
        let promo = insert_promotion(&db, PromotionKind::Fixed, 100, None, &[&a.id, &b.id]).await;

        let ids = db.promotions().product_ids(&promo.id).await.unwrap();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&a.id));
    }

    #[tokio::test]
    async fn test_percent_above_hundred_refused_by_storage() {
        let db = test_db().await;
        let promo = caja_core::Promotion {
            id: uuid::Uuid::new_v4().to_string(),
            name: "bad".to_string(),
            kind: PromotionKind::Percent,
            value: 10_001,
            active: true,
            category_id: None,
            created_at: chrono::Utc::now(),
        };

        let mut conn = db.pool().acquire().await.unwrap();
        let result =
            super::PromotionRepository::insert(&mut conn, &promo, &Default::default()).await;
        assert!(result.is_err());
    }
}
