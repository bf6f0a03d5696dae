//! # Checkout Orchestrator
//!
//! Sale checkout, void and preview.
//!
//! ## Checkout Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  validate draft, load products (pool)    ← every check before writing  │
//! │  BEGIN                                                                  │
//! │    INSERT sale (total 0)                 ← takes the write lock         │
//! │    re-read products, INSERT items (discount 0)                          │
//! │    load active promotions, UPDATE item discounts                        │
//! │    UPDATE sale total                                                    │
//! │    ledger OUT × N (reason SALE)                                         │
//! │    INSERT pending DTE                                                   │
//! │    INSERT audit SALE_CHECKOUT                                           │
//! │  COMMIT                                  ← any `?` above rolls back     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Void starts with the guarded `UPDATE ... WHERE status = 'OK'`, so of two
//! concurrent voids exactly one reverses the stock.

use std::collections::HashMap;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use sqlx::SqliteConnection;
use tracing::{debug, info};
use ts_rs::TS;
use uuid::Uuid;

use caja_core::validation::validate_name;
use caja_core::{
    compute_preview, compute_total, AuditAction, CoreError, Money, MovementType, PreviewRequestLine, Product,
    PromotionSet, Sale, SaleDraft, SaleItem, SalePreview, SaleStatus, MAX_NOTE_LENGTH,
    REASON_SALE, REASON_VOID,
};
use caja_db::{
    AuditRepository, Database, DocumentRepository, InventoryRepository, ProductRepository,
    PromotionRepository, SaleRepository,
};

use crate::error::{ServiceError, ServiceResult};

/// Result of a committed checkout.
#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct CheckoutReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
    /// Quantized total as a decimal string.
    pub total: String,
    pub status: SaleStatus,
}

/// Result of a void request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct VoidOutcome {
    pub sale_id: String,
    pub status: SaleStatus,
    /// `false` when the sale was already VOID and nothing changed.
    pub applied: bool,
}

/// Sale operations.
#[derive(Debug, Clone)]
pub struct SaleService {
    db: Database,
}

impl SaleService {
    pub fn new(db: Database) -> Self {
        SaleService { db }
    }

    /// Commits a sale with promotions applied, stock debited, a pending
    /// DTE and an audit entry, all or nothing.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for a malformed draft
    /// - `NOT_FOUND` when a line names an unknown product
    pub async fn checkout(&self, draft: &SaleDraft, actor: &str) -> ServiceResult<CheckoutReceipt> {
        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        let lines = draft.validate()?;

        let ids: Vec<String> = lines.iter().map(|l| l.product_id.clone()).collect();
        let known = self.db.products().get_many(&ids).await?;
        if let Some(missing) = ids.iter().find(|id| !known.contains_key(*id)) {
            return Err(ServiceError::not_found("Product", missing));
        }

        let now = Utc::now();
        let mut sale = Sale {
            id: Uuid::new_v4().to_string(),
            user_id: actor.to_string(),
            status: SaleStatus::Ok,
            payment_method: draft.payment_method,
            total_cents: 0,
            note: draft.note.trim().to_string(),
            created_at: now,
            updated_at: now,
        };

        debug!(sale_id = %sale.id, lines = lines.len(), "Starting checkout");

        let mut tx = self.db.begin().await?;

        SaleRepository::insert(&mut tx, &sale).await?;

        // Snapshots come from inside the transaction, after the lock is held
        let products = ProductRepository::find_many(&mut tx, &ids).await?;

        for (index, line) in lines.iter().enumerate() {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| ServiceError::not_found("Product", &line.product_id))?;

            let item = SaleItem {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                line_no: index as i64 + 1,
                product_id: product.id.clone(),
                code_snapshot: product.code.clone(),
                name_snapshot: product.name.clone(),
                qty: line.qty,
                unit_price_cents: line.unit_price.unwrap_or_else(|| product.price()).cents(),
                discount_cents: 0,
                created_at: now,
            };
            SaleRepository::insert_item(&mut tx, &item).await?;
        }

        let items = recalculate_sale_discounts(&mut tx, &sale.id).await?;

        let total = compute_total(&items)?;
        SaleRepository::set_total(&mut tx, &sale.id, total.cents()).await?;
        sale.total_cents = total.cents();

        for item in &items {
            InventoryRepository::register_movement(
                &mut tx,
                &item.product_id,
                MovementType::Out,
                item.qty,
                REASON_SALE,
            )
            .await?;
        }

        DocumentRepository::create_pending(&mut tx, &sale.id).await?;

        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::SaleCheckout,
            "Sale",
            &sale.id,
            &json!({ "total": [null, total.to_string()] }),
        )
        .await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            total = %total,
            items = items.len(),
            actor = %actor,
            "Sale checked out"
        );

        Ok(CheckoutReceipt {
            total: total.to_string(),
            status: sale.status,
            sale,
            items,
        })
    }

    /// Voids a sale and returns its stock.
    ///
    /// Voiding a VOID sale is a no-op: no movement, no audit entry.
    pub async fn void(&self, sale_id: &str, reason: &str, actor: &str) -> ServiceResult<VoidOutcome> {
        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        validate_name("reason", reason, MAX_NOTE_LENGTH)?;
        let reason = reason.trim();

        let mut tx = self.db.begin().await?;

        if !SaleRepository::mark_void(&mut tx, sale_id, reason).await? {
            let sale = SaleRepository::find(&mut tx, sale_id)
                .await?
                .ok_or_else(|| ServiceError::not_found("Sale", sale_id))?;

            debug!(sale_id = %sale_id, status = sale.status.as_str(), "Sale already void");
            return Ok(VoidOutcome {
                sale_id: sale.id,
                status: sale.status,
                applied: false,
            });
        }

        let items = SaleRepository::items(&mut tx, sale_id).await?;
        for item in &items {
            InventoryRepository::register_movement(
                &mut tx,
                &item.product_id,
                MovementType::In,
                item.qty,
                REASON_VOID,
            )
            .await?;
        }

        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::SaleVoid,
            "Sale",
            sale_id,
            &json!({ "reason": reason }),
        )
        .await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, items = items.len(), actor = %actor, "Sale voided");

        Ok(VoidOutcome {
            sale_id: sale_id.to_string(),
            status: SaleStatus::Void,
            applied: true,
        })
    }

    /// Prices candidate lines without writing anything.
    pub async fn preview(&self, lines: &[PreviewRequestLine]) -> ServiceResult<SalePreview> {
        let ids: Vec<String> = lines
            .iter()
            .filter_map(|line| line.product_id.clone())
            .collect();

        let products = self.db.products().get_many(&ids).await?;
        let promotions = self.db.promotions().load_active().await?;

        Ok(compute_preview(lines, &products, &promotions))
    }

    /// Items of an OK sale priced against the promotions active now.
    ///
    /// Nothing is written: the stored discounts and total stay as committed.
    /// The status check and the item read share one read transaction, so both
    /// see the same side of a concurrent void.
    pub async fn quote_sale_discounts(&self, sale_id: &str) -> ServiceResult<Vec<SaleItem>> {
        let mut tx = self.db.begin().await?;

        let sale = SaleRepository::find(&mut tx, sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))?;

        if sale.is_void() {
            return Err(CoreError::invalid_state(
                "Sale",
                sale_id,
                sale.status.as_str(),
                "quote discounts",
            )
            .into());
        }

        let mut items = SaleRepository::items(&mut tx, sale_id).await?;
        let discounts = best_unit_discounts(&mut tx, &items).await?;
        tx.rollback().await?;

        for (item, discount) in items.iter_mut().zip(discounts) {
            item.discount_cents = discount.cents();
        }

        Ok(items)
    }

    /// A committed sale with its items.
    pub async fn receipt(&self, sale_id: &str) -> ServiceResult<CheckoutReceipt> {
        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Sale", sale_id))?;
        let items = self.db.sales().get_items(sale_id).await?;

        Ok(CheckoutReceipt {
            total: sale.total().to_string(),
            status: sale.status,
            sale,
            items,
        })
    }

    pub async fn list_recent(&self, limit: i64) -> ServiceResult<Vec<Sale>> {
        Ok(self.db.sales().list_recent(limit).await?)
    }
}

/// Applies the active promotion set to every item of a sale and stores
/// the changed discounts.
///
/// With no active promotion every discount is reset to zero. Only called
/// inside checkout, before the total is computed.
async fn recalculate_sale_discounts(
    conn: &mut SqliteConnection,
    sale_id: &str,
) -> ServiceResult<Vec<SaleItem>> {
    let mut items = SaleRepository::items(&mut *conn, sale_id).await?;
    let discounts = best_unit_discounts(&mut *conn, &items).await?;

    for (item, discount) in items.iter_mut().zip(discounts) {
        if discount.cents() != item.discount_cents {
            SaleRepository::set_item_discount(&mut *conn, &item.id, discount.cents()).await?;
            item.discount_cents = discount.cents();
        }
    }

    Ok(items)
}

/// Best unit discount per item under the active promotion set, in item order.
async fn best_unit_discounts(
    conn: &mut SqliteConnection,
    items: &[SaleItem],
) -> ServiceResult<Vec<Money>> {
    let promotions = PromotionRepository::load_active_in(&mut *conn).await?;

    let products: HashMap<String, Product> = if promotions.is_empty() {
        HashMap::new()
    } else {
        let ids: Vec<String> = items.iter().map(|i| i.product_id.clone()).collect();
        ProductRepository::find_many(&mut *conn, &ids).await?
    };

    Ok(items
        .iter()
        .map(|item| unit_discount_for(item, products.get(&item.product_id), &promotions))
        .collect())
}

fn unit_discount_for(item: &SaleItem, product: Option<&Product>, promotions: &PromotionSet) -> Money {
    match product {
        Some(product) => promotions.best_unit_discount(product, item.unit_price()),
        None => Money::zero(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testing::{count_rows, create_product, test_pos};
    use caja_core::{DocumentStatus, DraftLine, PaymentMethod, PromotionKind};
    use crate::catalog::NewPromotion;

    fn draft(lines: &[(&str, i64)]) -> SaleDraft {
        SaleDraft {
            payment_method: PaymentMethod::Cash,
            note: String::new(),
            items: lines
                .iter()
                .map(|(id, qty)| DraftLine {
                    product_id: id.to_string(),
                    qty: *qty,
                    unit_price: None,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_checkout_without_promotions() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;

        let receipt = pos.checkout(&draft(&[(&a.id, 1)]), "cajero").await.unwrap();

        assert_eq!(receipt.total, "1000");
        assert_eq!(receipt.status, SaleStatus::Ok);
        assert_eq!(receipt.items[0].discount_cents, 0);
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 9);

        let audit = pos.db().audit().list_for_object("Sale", &receipt.sale.id).await.unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::SaleCheckout);
        assert_eq!(audit[0].changes_json()["total"][1], "1000");

        let movements = pos.inventory().movements(&a.id, 10).await.unwrap();
        assert_eq!(movements[0].kind, MovementType::Out);
        assert_eq!(movements[0].qty, 1);
        assert_eq!(movements[0].reason, "SALE");

        let dte = pos.documents().get_for_sale(&receipt.sale.id).await.unwrap();
        assert_eq!(dte.status, DocumentStatus::Pending);
    }

    #[tokio::test]
    async fn test_checkout_applies_category_percent() {
        let pos = test_pos().await;
        let category = pos.catalog().create_category("X").await.unwrap();
        let a = create_product(&pos, "A", Some(&category.id), "1000", 10).await;
        pos.catalog()
            .create_promotion(&NewPromotion {
                name: "10% X".to_string(),
                kind: PromotionKind::Percent,
                value: "10".to_string(),
                category_id: Some(category.id.clone()),
                product_ids: vec![],
            })
            .await
            .unwrap();

        let receipt = pos.checkout(&draft(&[(&a.id, 1)]), "cajero").await.unwrap();

        assert_eq!(receipt.items[0].discount(), Money::from_units(100));
        assert_eq!(receipt.total, "900");
    }

    #[tokio::test]
    async fn test_best_promotion_wins_without_stacking() {
        let pos = test_pos().await;
        let category = pos.catalog().create_category("X").await.unwrap();
        let a = create_product(&pos, "A", Some(&category.id), "1000", 10).await;
        for (kind, value, category_id, members) in [
            (PromotionKind::Percent, "10", Some(category.id.clone()), vec![]),
            (PromotionKind::Fixed, "150", None, vec![a.id.clone()]),
        ] {
            pos.catalog()
                .create_promotion(&NewPromotion {
                    name: format!("{kind:?}"),
                    kind,
                    value: value.to_string(),
                    category_id,
                    product_ids: members,
                })
                .await
                .unwrap();
        }

        let receipt = pos.checkout(&draft(&[(&a.id, 2)]), "cajero").await.unwrap();

        assert_eq!(receipt.items[0].discount(), Money::from_units(150));
        assert_eq!(receipt.total, "1700");
    }

    #[tokio::test]
    async fn test_explicit_unit_price_and_rounding() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;

        let mut request = draft(&[(&a.id, 3)]);
        request.items[0].unit_price = Some("333.50".to_string());

        let receipt = pos.checkout(&request, "cajero").await.unwrap();

        assert_eq!(receipt.items[0].unit_price_cents, 33_350);
        // 1000.50 rounds half up
        assert_eq!(receipt.total, "1001");
        assert_eq!(receipt.sale.total_cents, 100_100);
    }

    #[tokio::test]
    async fn test_checkout_oversell_clamps_stock() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 2).await;

        pos.checkout(&draft(&[(&a.id, 5)]), "cajero").await.unwrap();

        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_invalid_drafts_write_nothing() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;

        let err = pos.checkout(&draft(&[]), "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = pos.checkout(&draft(&[(&a.id, 0)]), "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = pos.checkout(&draft(&[(&a.id, 1000)]), "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut negative = draft(&[(&a.id, 1)]);
        negative.items[0].unit_price = Some("-1".to_string());
        let err = pos.checkout(&negative, "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let mut long_note = draft(&[(&a.id, 1)]);
        long_note.note = "x".repeat(141);
        let err = pos.checkout(&long_note, "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);

        let err = pos.checkout(&draft(&[(&a.id, 1), ("ghost", 1)]), "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        assert_eq!(count_rows(&pos, "sales").await, 0);
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_failed_debit_rolls_back_everything() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;
        let b = create_product(&pos, "B", None, "500", 10).await;
        let movements_before = count_rows(&pos, "inventory_movements").await;
        let audit_before = count_rows(&pos, "audit_logs").await;

        // Make the debit of the second line fail mid-transaction
        sqlx::query(&format!(
            "CREATE TRIGGER fail_b BEFORE INSERT ON inventory_movements \
             WHEN NEW.product_id = '{}' AND NEW.kind = 'OUT' \
             BEGIN SELECT RAISE(ABORT, 'disk on fire'); END",
            b.id
        ))
        .execute(pos.db().pool())
        .await
        .unwrap();

        let err = pos
            .checkout(&draft(&[(&a.id, 3), (&b.id, 2)]), "cajero")
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::Internal);

        assert_eq!(count_rows(&pos, "sales").await, 0);
        assert_eq!(count_rows(&pos, "sale_items").await, 0);
        assert_eq!(count_rows(&pos, "tax_documents").await, 0);
        assert_eq!(count_rows(&pos, "inventory_movements").await, movements_before);
        assert_eq!(count_rows(&pos, "audit_logs").await, audit_before);
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 10);
        assert_eq!(pos.catalog().get_product(&b.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_void_restores_stock_once() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;
        let b = create_product(&pos, "B", None, "500", 10).await;

        let receipt = pos
            .checkout(&draft(&[(&a.id, 3), (&b.id, 2)]), "cajero")
            .await
            .unwrap();
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 7);

        let first = pos.void(&receipt.sale.id, "cliente arrepentido", "jefe").await.unwrap();
        assert!(first.applied);
        assert_eq!(first.status, SaleStatus::Void);

        let second = pos.void(&receipt.sale.id, "otra vez", "jefe").await.unwrap();
        assert!(!second.applied);
        assert_eq!(second.status, SaleStatus::Void);

        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 10);
        assert_eq!(pos.catalog().get_product(&b.id).await.unwrap().stock, 10);

        let a_moves = pos.inventory().movements(&a.id, 10).await.unwrap();
        assert_eq!(a_moves[0].kind, MovementType::In);
        assert_eq!(a_moves[0].qty, 3);
        assert_eq!(a_moves[0].reason, "VOID");
        assert_eq!(a_moves[1].kind, MovementType::Out);
        let b_moves = pos.inventory().movements(&b.id, 10).await.unwrap();
        assert_eq!(b_moves[0].qty, 2);

        let sale = pos.sales().receipt(&receipt.sale.id).await.unwrap();
        assert_eq!(sale.status, SaleStatus::Void);
        assert_eq!(sale.sale.note, "cliente arrepentido");
        assert_eq!(sale.total, "4000");

        let audit = pos.db().audit().list_for_object("Sale", &receipt.sale.id).await.unwrap();
        assert_eq!(audit.len(), 2);
        assert_eq!(audit[1].action, AuditAction::SaleVoid);
        assert_eq!(audit[1].changes_json()["reason"], "cliente arrepentido");
    }

    #[tokio::test]
    async fn test_void_unknown_sale() {
        let pos = test_pos().await;
        let err = pos.void("missing", "x", "jefe").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        let err = pos.void("missing", "", "jefe").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_concurrent_voids_apply_once() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;
        let receipt = pos.checkout(&draft(&[(&a.id, 4)]), "cajero").await.unwrap();

        let (left, right) = tokio::join!(
            pos.void(&receipt.sale.id, "uno", "jefe"),
            pos.void(&receipt.sale.id, "dos", "jefe"),
        );
        let applied = [left.unwrap(), right.unwrap()]
            .iter()
            .filter(|outcome| outcome.applied)
            .count();

        assert_eq!(applied, 1);
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_concurrent_checkouts_debit_all() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 20).await;

        let (d1, d2, d3) = (
            draft(&[(&a.id, 2)]),
            draft(&[(&a.id, 3)]),
            draft(&[(&a.id, 4)]),
        );
        let (one, two, three) = tokio::join!(
            pos.checkout(&d1, "c1"),
            pos.checkout(&d2, "c2"),
            pos.checkout(&d3, "c3"),
        );
        one.unwrap();
        two.unwrap();
        three.unwrap();

        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 11);
    }

    #[tokio::test]
    async fn test_preview_writes_nothing() {
        let pos = test_pos().await;
        let category = pos.catalog().create_category("X").await.unwrap();
        let a = create_product(&pos, "A", Some(&category.id), "1000", 10).await;
        pos.catalog()
            .create_promotion(&NewPromotion {
                name: "10% X".to_string(),
                kind: PromotionKind::Percent,
                value: "10".to_string(),
                category_id: Some(category.id.clone()),
                product_ids: vec![],
            })
            .await
            .unwrap();
        let rows_before = count_rows(&pos, "inventory_movements").await;

        let lines = vec![
            PreviewRequestLine {
                product_id: Some(a.id.clone()),
                qty: 2,
                unit_price: Some("1000".to_string()),
            },
            PreviewRequestLine {
                product_id: None,
                qty: 1,
                unit_price: Some("1000".to_string()),
            },
            PreviewRequestLine {
                product_id: Some("ghost".to_string()),
                qty: 1,
                unit_price: Some("1000".to_string()),
            },
        ];

        let first = pos.preview(&lines).await.unwrap();
        let second = pos.preview(&lines).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first.items.len(), 1);
        assert_eq!(first.items[0].discount_unit, "100");
        assert_eq!(first.gross_total, "2000");
        assert_eq!(first.discount_total, "200");
        assert_eq!(first.net_total, "1800");

        assert_eq!(count_rows(&pos, "sales").await, 0);
        assert_eq!(count_rows(&pos, "inventory_movements").await, rows_before);
    }


    #[tokio::test]
    async fn test_quote_after_promotion_disabled_keeps_sale_intact() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;
        let promo = pos
            .catalog()
            .create_promotion(&NewPromotion {
                name: "150 off".to_string(),
                kind: PromotionKind::Fixed,
                value: "150".to_string(),
                category_id: None,
                product_ids: vec![a.id.clone()],
            })
            .await
            .unwrap();
        let receipt = pos.checkout(&draft(&[(&a.id, 1)]), "cajero").await.unwrap();
        assert_eq!(receipt.items[0].discount_cents, 15_000);
        assert_eq!(receipt.total, "850");

        pos.catalog().set_promotion_active(&promo.id, false).await.unwrap();
        let quoted = pos.sales().quote_sale_discounts(&receipt.sale.id).await.unwrap();
        assert_eq!(quoted[0].discount_cents, 0);

        // Stored sale still satisfies total == quantize(Σ net lines)
        let stored = pos.sales().receipt(&receipt.sale.id).await.unwrap();
        assert_eq!(stored.items[0].discount_cents, 15_000);
        assert_eq!(stored.total, "850");
        assert_eq!(compute_total(&stored.items).unwrap(), stored.sale.total());

        pos.void(&receipt.sale.id, "x", "jefe").await.unwrap();
        let err = pos.sales().quote_sale_discounts(&receipt.sale.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidState);

        let err = pos.sales().quote_sale_discounts("missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_quote_and_concurrent_void() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;
        let receipt = pos.checkout(&draft(&[(&a.id, 1)]), "cajero").await.unwrap();

        let sales = pos.sales();
        let (quote, void) = tokio::join!(
            sales.quote_sale_discounts(&receipt.sale.id),
            pos.void(&receipt.sale.id, "x", "jefe"),
        );
        assert!(void.unwrap().applied);

        // Either the quote read an OK sale or it saw the VOID; never a mix
        match quote {
            Ok(items) => assert_eq!(items.len(), 1),
            Err(err) => assert_eq!(err.code, ErrorCode::InvalidState),
        }
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 10);
    }

    #[tokio::test]
    async fn test_huge_unit_price_is_rejected_before_writing() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;
        let huge = SaleDraft {
            items: vec![DraftLine {
                product_id: a.id.clone(),
                qty: 10,
                unit_price: Some("10000000000000000".to_string()),
            }],
            ..Default::default()
        };

        let err = pos.checkout(&huge, "cajero").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(count_rows(&pos, "sales").await, 0);
        assert_eq!(pos.catalog().get_product(&a.id).await.unwrap().stock, 10);

        let largest = SaleDraft {
            items: vec![DraftLine {
                product_id: a.id.clone(),
                qty: 999,
                unit_price: Some("99999999.99".to_string()),
            }],
            ..Default::default()
        };
        let receipt = pos.checkout(&largest, "cajero").await.unwrap();
        assert_eq!(receipt.total, "99899999990");
    }

    #[tokio::test]
    async fn test_preview_drops_oversized_lines() {
        let pos = test_pos().await;
        let a = create_product(&pos, "A", None, "1000", 10).await;

        let preview = pos
            .preview(&[
                PreviewRequestLine {
                    product_id: Some(a.id.clone()),
                    qty: i64::MAX / 2,
                    unit_price: Some("1000".to_string()),
                },
                PreviewRequestLine {
                    product_id: Some(a.id.clone()),
                    qty: 1,
                    unit_price: Some("10000000000000000".to_string()),
                },
                PreviewRequestLine {
                    product_id: Some(a.id.clone()),
                    qty: 2,
                    unit_price: Some("1000".to_string()),
                },
            ])
            .await
            .unwrap();

        assert_eq!(preview.items.len(), 1);
        assert_eq!(preview.net_total, "2000");
    }
}
