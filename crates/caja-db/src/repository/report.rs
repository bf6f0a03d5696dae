//! # Report Queries
//!
//! Read-only aggregates for dashboards. Only OK sales count toward totals.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::DbResult;

/// Sales of one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DailySales {
    /// `YYYY-MM-DD`
    pub day: String,
    pub total_cents: i64,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct ReportRepository {
    pool: SqlitePool,
}

impl ReportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ReportRepository { pool }
    }

    /// Sum of all OK sale totals, in cents.
    pub async fn sales_total(&self) -> DbResult<i64> {
        let total: i64 =
            sqlx::query_scalar("SELECT COALESCE(SUM(total_cents), 0) FROM sales WHERE status = 'OK'")
                .fetch_one(&self.pool)
                .await?;

        Ok(total)
    }

    /// OK sales grouped by day, oldest day first.
    pub async fn sales_by_day(&self) -> DbResult<Vec<DailySales>> {
        let rows = sqlx::query_as::<_, DailySales>(
            r#"
            SELECT substr(created_at, 1, 10) AS day,
                   COALESCE(SUM(total_cents), 0) AS total_cents,
                   COUNT(*) AS count
            FROM sales
            WHERE status = 'OK'
            GROUP BY day
            ORDER BY day
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Active products with no stock left.
    pub async fn stock_out_count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE active = 1 AND stock = 0")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::{insert_product, test_db};

    #[tokio::test]
    async fn test_totals_ignore_void_sales() {
        let db = test_db().await;
        for (id, status, total, day) in [
            ("s1", "OK", 100_000, "2026-03-01T10:00:00+00:00"),
            ("s2", "OK", 50_000, "2026-03-01T11:00:00+00:00"),
            ("s3", "VOID", 70_000, "2026-03-01T12:00:00+00:00"),
            ("s4", "OK", 20_000, "2026-03-02T09:00:00+00:00"),
        ] {
            sqlx::query(
                "INSERT INTO sales (id, user_id, status, payment_method, total_cents, note, created_at, updated_at) \
                 VALUES (?1, 'cajero', ?2, 'CASH', ?3, '', ?4, ?4)",
            )
            .bind(id)
            .bind(status)
            .bind(total)
            .bind(day)
            .execute(db.pool())
            .await
            .unwrap();
        }

        assert_eq!(db.reports().sales_total().await.unwrap(), 170_000);

        let days = db.reports().sales_by_day().await.unwrap();
        assert_eq!(days.len(), 2);
        assert_eq!(days[0].day, "2026-03-01");
        assert_eq!(days[0].total_cents, 150_000);
        assert_eq!(days[0].count, 2);
        assert_eq!(days[1].total_cents, 20_000);
    }

    #[tokio::test]
    async fn test_stock_out_count() {
        let db = test_db().await;
        insert_product(&db, "EMPTY", None, 1000, 0).await;
        insert_product(&db, "FULL", None, 1000, 3).await;

        assert_eq!(db.reports().stock_out_count().await.unwrap(), 1);
    }
}
