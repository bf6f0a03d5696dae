//! # Tax Document Repository
//!
//! One DTE row per sale, created PENDING at checkout.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use caja_core::{DocumentStatus, TaxDocument};

const DOCUMENT_COLUMNS: &str = "id, sale_id, status, external_id, message, created_at, updated_at";

/// Repository for tax documents.
#[derive(Debug, Clone)]
pub struct DocumentRepository {
    pool: SqlitePool,
}

impl DocumentRepository {
    pub fn new(pool: SqlitePool) -> Self {
        DocumentRepository { pool }
    }

    /// Creates the PENDING document for a sale.
    pub async fn create_pending(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<TaxDocument> {
        let now = Utc::now();
        let document = TaxDocument {
            id: Uuid::new_v4().to_string(),
            sale_id: sale_id.to_string(),
            status: DocumentStatus::Pending,
            external_id: String::new(),
            message: String::new(),
            created_at: now,
            updated_at: now,
        };

        debug!(sale_id = %sale_id, "Creating pending tax document");

        sqlx::query(
            r#"
            INSERT INTO tax_documents (id, sale_id, status, external_id, message, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&document.id)
        .bind(&document.sale_id)
        .bind(document.status)
        .bind(&document.external_id)
        .bind(&document.message)
        .bind(document.created_at)
        .bind(document.updated_at)
        .execute(conn)
        .await?;

        Ok(document)
    }

    pub async fn get_by_sale(&self, sale_id: &str) -> DbResult<Option<TaxDocument>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_by_sale(&mut conn, sale_id).await
    }

    pub async fn find_by_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Option<TaxDocument>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM tax_documents WHERE sale_id = ?1");
        let document = sqlx::query_as::<_, TaxDocument>(&sql)
            .bind(sale_id)
            .fetch_optional(conn)
            .await?;

        Ok(document)
    }

    /// Documents in a given status, oldest first.
    pub async fn list_by_status(&self, status: DocumentStatus) -> DbResult<Vec<TaxDocument>> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM tax_documents WHERE status = ?1 ORDER BY created_at");
        let documents = sqlx::query_as::<_, TaxDocument>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;

        Ok(documents)
    }

    /// Stores the fiscal authority's answer.
    ///
    /// ## Returns
    /// `false` when the sale has no document.
    pub async fn set_status(
        conn: &mut SqliteConnection,
        sale_id: &str,
        status: DocumentStatus,
        message: &str,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE tax_documents SET status = ?2, message = ?3, updated_at = ?4 WHERE sale_id = ?1",
        )
        .bind(sale_id)
        .bind(status)
        .bind(message)
        .bind(Utc::now())
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::testing::test_db;

    async fn insert_sale(conn: &mut SqliteConnection) -> String {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO sales (id, user_id, status, payment_method, total_cents, note, created_at, updated_at) \
             VALUES (?1, 'cajero', 'OK', 'CASH', 0, '', ?2, ?2)",
        )
        .bind(&id)
        .bind(Utc::now())
        .execute(conn)
        .await
        .unwrap();
        id
    }

    #[tokio::test]
    async fn test_pending_then_sent() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let sale_id = insert_sale(&mut conn).await;

        DocumentRepository::create_pending(&mut conn, &sale_id).await.unwrap();
        assert!(DocumentRepository::set_status(&mut conn, &sale_id, DocumentStatus::Sent, "ok")
            .await
            .unwrap());
        drop(conn);

        let document = db.documents().get_by_sale(&sale_id).await.unwrap().unwrap();
        assert_eq!(document.status, DocumentStatus::Sent);
        assert!(db.documents().list_by_status(DocumentStatus::Pending).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_one_document_per_sale() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();
        let sale_id = insert_sale(&mut conn).await;

        DocumentRepository::create_pending(&mut conn, &sale_id).await.unwrap();
        let err = DocumentRepository::create_pending(&mut conn, &sale_id).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_set_status_without_document() {
        let db = test_db().await;
        let mut conn = db.pool().acquire().await.unwrap();

        assert!(!DocumentRepository::set_status(&mut conn, "nope", DocumentStatus::Rejected, "")
            .await
            .unwrap());
    }
}
