//! # Tax Documents (DTE)
//!
//! Every sale gets a PENDING document at checkout. There is no fiscal
//! authority integration; `simulate_result` stores the answer it would give.

use serde_json::json;
use tracing::info;

use caja_core::validation::validate_name;
use caja_core::{AuditAction, DocumentStatus, TaxDocument, ValidationError, MAX_NOTE_LENGTH};
use caja_db::{AuditRepository, Database, DocumentRepository};

use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone)]
pub struct DocumentService {
    db: Database,
}

impl DocumentService {
    pub fn new(db: Database) -> Self {
        DocumentService { db }
    }

    pub async fn get_for_sale(&self, sale_id: &str) -> ServiceResult<TaxDocument> {
        self.db
            .documents()
            .get_by_sale(sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("TaxDocument", sale_id))
    }

    /// Documents still waiting for an answer, oldest first.
    pub async fn pending(&self) -> ServiceResult<Vec<TaxDocument>> {
        Ok(self.db.documents().list_by_status(DocumentStatus::Pending).await?)
    }

    /// Records a simulated authority answer (`PENDING`, `SENT` or `REJECTED`).
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for any other result
    /// - `NOT_FOUND` when the sale has no document
    pub async fn simulate_result(
        &self,
        sale_id: &str,
        result: &str,
        actor: &str,
    ) -> ServiceResult<TaxDocument> {
        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        let status = DocumentStatus::parse(result).ok_or_else(|| ValidationError::NotAllowed {
            field: "result".to_string(),
            allowed: [DocumentStatus::Pending, DocumentStatus::Sent, DocumentStatus::Rejected]
                .iter()
                .map(|s| s.as_str().to_string())
                .collect(),
        })?;

        let previous = self.get_for_sale(sale_id).await?;
        let message = format!("Simulated {}", status.as_str());

        let mut tx = self.db.begin().await?;

        if !DocumentRepository::set_status(&mut tx, sale_id, status, &message).await? {
            return Err(ServiceError::not_found("TaxDocument", sale_id));
        }

        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::DteResult,
            "TaxDocument",
            &previous.id,
            &json!({ "status": [previous.status.as_str(), status.as_str()] }),
        )
        .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, from = previous.status.as_str(), to = status.as_str(), "DTE result recorded");

        self.get_for_sale(sale_id).await
    }
}
