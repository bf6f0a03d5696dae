//! # Audit Repository
//!
//! Append-only audit trail. Rows are inserted on the caller's transaction so
//! an audit entry commits or rolls back with the change it describes.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use caja_core::{AuditAction, AuditLog};

const AUDIT_COLUMNS: &str = "id, actor, action, model, obj_id, changes, ts";

/// Repository for audit log operations.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends an audit entry.
    pub async fn record(
        conn: &mut SqliteConnection,
        actor: &str,
        action: AuditAction,
        model: &str,
        obj_id: &str,
        changes: &serde_json::Value,
    ) -> DbResult<AuditLog> {
        let entry = AuditLog {
            id: Uuid::new_v4().to_string(),
            actor: actor.to_string(),
            action,
            model: model.to_string(),
            obj_id: obj_id.to_string(),
            changes: changes.to_string(),
            ts: Utc::now(),
        };

        debug!(action = ?action, model = %model, obj_id = %obj_id, actor = %actor, "Recording audit entry");

        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, actor, action, model, obj_id, changes, ts)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.actor)
        .bind(entry.action)
        .bind(&entry.model)
        .bind(&entry.obj_id)
        .bind(&entry.changes)
        .bind(entry.ts)
        .execute(conn)
        .await?;

        Ok(entry)
    }

    /// Latest entries, newest first.
    pub async fn list(&self, limit: i64) -> DbResult<Vec<AuditLog>> {
        let sql = format!("SELECT {AUDIT_COLUMNS} FROM audit_logs ORDER BY ts DESC, rowid DESC LIMIT ?1");
        let entries = sqlx::query_as::<_, AuditLog>(&sql)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// History of one object, oldest first.
    pub async fn list_for_object(&self, model: &str, obj_id: &str) -> DbResult<Vec<AuditLog>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE model = ?1 AND obj_id = ?2 ORDER BY ts, rowid"
        );
        let entries = sqlx::query_as::<_, AuditLog>(&sql)
            .bind(model)
            .bind(obj_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }

    /// Entries written by one actor, newest first.
    pub async fn list_by_actor(&self, actor: &str, limit: i64) -> DbResult<Vec<AuditLog>> {
        let sql = format!(
            "SELECT {AUDIT_COLUMNS} FROM audit_logs WHERE actor = ?1 ORDER BY ts DESC, rowid DESC LIMIT ?2"
        );
        let entries = sqlx::query_as::<_, AuditLog>(&sql)
            .bind(actor)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}
