//! # Cash Session Repository
//!
//! Register sessions. At most one row may be OPEN; the partial unique index
//! `idx_cash_sessions_single_open` turns a second open into a
//! `DbError::UniqueViolation` on `cash_sessions.status`.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use caja_core::CashSession;

const SESSION_COLUMNS: &str = "id, status, opened_by, closed_by, opening_amount_cents, \
     closing_amount_cents, diff_cents, opened_at, closed_at";

/// Repository for cash session database operations.
#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    pool: SqlitePool,
}

impl CashSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CashSessionRepository { pool }
    }

    /// The newest OPEN session, if any.
    pub async fn current(&self) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions \
             WHERE status = 'OPEN' ORDER BY opened_at DESC, rowid DESC LIMIT 1"
        );
        let session = sqlx::query_as::<_, CashSession>(&sql)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let mut conn = self.pool.acquire().await?;
        Self::find(&mut conn, id).await
    }

    /// Gets a session on an existing connection or transaction.
    pub async fn find(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM cash_sessions WHERE id = ?1");
        let session = sqlx::query_as::<_, CashSession>(&sql)
            .bind(id)
            .fetch_optional(conn)
            .await?;

        Ok(session)
    }

    /// Sessions, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<CashSession>> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM cash_sessions ORDER BY opened_at DESC, rowid DESC LIMIT ?1"
        );
        let sessions = sqlx::query_as::<_, CashSession>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(sessions)
    }

    /// Inserts a new session row.
    pub async fn insert(conn: &mut SqliteConnection, session: &CashSession) -> DbResult<()> {
        debug!(id = %session.id, opened_by = %session.opened_by, "Inserting cash session");

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, status, opened_by, closed_by,
                opening_amount_cents, closing_amount_cents, diff_cents,
                opened_at, closed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&session.id)
        .bind(session.status)
        .bind(&session.opened_by)
        .bind(&session.closed_by)
        .bind(session.opening_amount_cents)
        .bind(session.closing_amount_cents)
        .bind(session.diff_cents)
        .bind(session.opened_at)
        .bind(session.closed_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// OPEN → CLOSED in a single guarded update.
    ///
    /// ## Returns
    /// `false` when the session was not OPEN.
    pub async fn close(
        conn: &mut SqliteConnection,
        id: &str,
        closing_amount_cents: i64,
        diff_cents: i64,
        closed_by: &str,
        closed_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cash_sessions SET
                status = 'CLOSED',
                closing_amount_cents = ?2,
                diff_cents = ?3,
                closed_by = ?4,
                closed_at = ?5
            WHERE id = ?1 AND status = 'OPEN'
            "#,
        )
        .bind(id)
        .bind(closing_amount_cents)
        .bind(diff_cents)
        .bind(closed_by)
        .bind(closed_at)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
