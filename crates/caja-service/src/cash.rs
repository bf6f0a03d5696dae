//! # Cash Session Manager
//!
//! One register session at a time, closed against a counted amount.
//!
//! ```text
//! open(amount)  ──► OPEN ──close(counted)──► CLOSED   diff = counted - opening
//!                    │
//!                    └── second open while OPEN → CONFLICT (storage index)
//! ```

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};
use ts_rs::TS;
use uuid::Uuid;

use caja_core::validation::{parse_amount, validate_name};
use caja_core::{AuditAction, CashSession, CashSessionStatus, CoreError, Money, MAX_NOTE_LENGTH};
use caja_db::{AuditRepository, CashSessionRepository, Database};

use crate::error::{ServiceError, ServiceResult};

/// Result of closing a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct CloseOutcome {
    pub session_id: String,
    pub status: CashSessionStatus,
    pub closing_amount: String,
    /// `closing_amount - opening_amount`; negative when cash is missing.
    pub diff: String,
}

#[derive(Debug, Clone)]
pub struct CashService {
    db: Database,
}

impl CashService {
    pub fn new(db: Database) -> Self {
        CashService { db }
    }

    /// Opens a session with the given float.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for a missing, malformed or negative amount
    /// - `CONFLICT` when another session is already OPEN
    pub async fn open(&self, opening_amount: &str, actor: &str) -> ServiceResult<CashSession> {
        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        let opening = parse_amount(Some(opening_amount), "opening_amount")?;

        let session = CashSession {
            id: Uuid::new_v4().to_string(),
            status: CashSessionStatus::Open,
            opened_by: actor.to_string(),
            closed_by: None,
            opening_amount_cents: opening.cents(),
            closing_amount_cents: None,
            diff_cents: None,
            opened_at: Utc::now(),
            closed_at: None,
        };

        let mut tx = self.db.begin().await?;

        CashSessionRepository::insert(&mut tx, &session)
            .await
            .map_err(|e| {
                if e.is_unique_violation_on("cash_sessions.status") {
                    warn!(actor = %actor, "Cash session already open");
                    ServiceError::from(CoreError::Conflict(
                        "A cash session is already open".to_string(),
                    ))
                } else {
                    ServiceError::from(e)
                }
            })?;

        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::CashOpen,
            "CashSession",
            &session.id,
            &json!({ "opening_amount": [null, opening.to_string()] }),
        )
        .await?;

        tx.commit().await?;

        info!(session_id = %session.id, opening = %opening, actor = %actor, "Cash session opened");

        Ok(session)
    }

    /// The newest OPEN session, if any.
    pub async fn current(&self) -> ServiceResult<Option<CashSession>> {
        Ok(self.db.cash_sessions().current().await?)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<CashSession> {
        self.db
            .cash_sessions()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("CashSession", id))
    }

    pub async fn list(&self, limit: i64) -> ServiceResult<Vec<CashSession>> {
        Ok(self.db.cash_sessions().list(limit).await?)
    }

    /// Closes a session against the counted amount.
    ///
    /// Checks run in this order, all before any write: unknown session
    /// (`NOT_FOUND`), already CLOSED (`INVALID_STATE`), bad amount
    /// (`VALIDATION_ERROR`).
    pub async fn close(
        &self,
        id: &str,
        closing_amount: Option<&str>,
        actor: &str,
    ) -> ServiceResult<CloseOutcome> {
        let session = self.get(id).await?;
        if !session.is_open() {
            return Err(closed_error(&session).into());
        }

        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        let closing = parse_amount(closing_amount, "closing_amount")?;
        let diff = closing - session.opening_amount();
        let closed_at = Utc::now();

        let mut tx = self.db.begin().await?;

        let closed = CashSessionRepository::close(
            &mut tx,
            id,
            closing.cents(),
            diff.cents(),
            actor,
            closed_at,
        )
        .await?;

        if !closed {
            // Closed by someone else since the check above
            return Err(closed_error(&session).into());
        }

        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::CashClose,
            "CashSession",
            id,
            &json!({
                "status": [CashSessionStatus::Open.as_str(), CashSessionStatus::Closed.as_str()],
                "closing_amount": [null, closing.to_string()],
                "diff": [null, diff.to_string()],
            }),
        )
        .await?;

        tx.commit().await?;

        if diff != Money::zero() {
            warn!(session_id = %id, diff = %diff, "Cash session closed with a difference");
        }
        info!(session_id = %id, closing = %closing, diff = %diff, actor = %actor, "Cash session closed");

        Ok(CloseOutcome {
            session_id: id.to_string(),
            status: CashSessionStatus::Closed,
            closing_amount: closing.to_string(),
            diff: diff.to_string(),
        })
    }
}

fn closed_error(session: &CashSession) -> CoreError {
    CoreError::invalid_state(
        "CashSession",
        &session.id,
        CashSessionStatus::Closed.as_str(),
        "close",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::test_pos;

    #[tokio::test]
    async fn test_open_and_close_with_shortfall() {
        let pos = test_pos().await;

        let session = pos.open("5000", "cajero").await.unwrap();
        assert_eq!(pos.cash().current().await.unwrap().unwrap().id, session.id);

        let outcome = pos.close(&session.id, Some("4800"), "jefe").await.unwrap();
        assert_eq!(outcome.status, CashSessionStatus::Closed);
        assert_eq!(outcome.closing_amount, "4800");
        assert_eq!(outcome.diff, "-200");

        let stored = pos.cash().get(&session.id).await.unwrap();
        assert_eq!(stored.status, CashSessionStatus::Closed);
        assert_eq!(stored.diff_cents, Some(-20_000));
        assert_eq!(stored.closed_by.as_deref(), Some("jefe"));
        assert!(pos.cash().current().await.unwrap().is_none());

        let audit = pos.db().audit().list_for_object("CashSession", &session.id).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].action, AuditAction::CashClose);
        assert_eq!(audit[1].changes_json()["diff"][1], "-200");
    }

    #[tokio::test]
    async fn test_close_twice_is_invalid_state() {
        let pos = test_pos().await;
        let session = pos.open("5000", "cajero").await.unwrap();
        pos.close(&session.id, Some("4800"), "jefe").await.unwrap();

        let err = pos.close(&session.id, Some("9999"), "otro").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        // Checked before the amount
        let err = pos.close(&session.id, Some(""), "otro").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let stored = pos.cash().get(&session.id).await.unwrap();
        assert_eq!(stored.closing_amount_cents, Some(480_000));
        assert_eq!(stored.closed_by.as_deref(), Some("jefe"));
    }

    #[tokio::test]
    async fn test_bad_closing_amount_leaves_session_open() {
        let pos = test_pos().await;
        let session = pos.open("5000", "cajero").await.unwrap();

        for amount in [Some(""), Some("   "), Some("abc"), Some("-1"), None] {
            let err = pos.close(&session.id, amount, "jefe").await.unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationError, "amount {amount:?}");
        }

        let stored = pos.cash().get(&session.id).await.unwrap();
        assert_eq!(stored.status, CashSessionStatus::Open);
        assert_eq!(stored.closing_amount_cents, None);
    }

    #[tokio::test]
    async fn test_close_unknown_session() {
        let pos = test_pos().await;
        let err = pos.close("missing", Some("100"), "jefe").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_second_open_conflicts() {
        let pos = test_pos().await;
        let first = pos.open("1000", "cajero").await.unwrap();

        let err = pos.open("2000", "otro").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Conflict);

        pos.close(&first.id, Some("1000"), "cajero").await.unwrap();
        let second = pos.open("2000", "otro").await.unwrap();
        assert_eq!(pos.cash().current().await.unwrap().unwrap().id, second.id);
        assert_eq!(pos.cash().list(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_negative_opening_rejected() {
        let pos = test_pos().await;
        let err = pos.open("-5", "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(pos.cash().current().await.unwrap().is_none());
    }
}
