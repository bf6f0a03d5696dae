//! # Catalog Service
//!
//! Categories, products and promotions.
//!
//! Opening stock of a new product is an `INITIAL` IN movement written in the
//! same transaction as the product row. Price changes are audited with the
//! before and after values.

use std::collections::HashSet;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use ts_rs::TS;
use uuid::Uuid;

use caja_core::validation::{
    parse_amount, validate_code, validate_name, validate_promotion_value, validate_stock_thresholds,
};
use caja_core::{
    AuditAction, Category, CoreError, MovementType, Product, Promotion, PromotionKind, StockLevel,
    ValidationError, MAX_NOTE_LENGTH, REASON_INITIAL,
};
use caja_db::{
    AuditRepository, CategoryRepository, Database, DbError, InventoryRepository,
    ProductRepository, PromotionRepository,
};

use crate::error::{ServiceError, ServiceResult};

const MAX_CATEGORY_NAME: usize = 80;
const MAX_PRODUCT_NAME: usize = 200;

/// Input for [`CatalogService::create_product`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub category_id: Option<String>,
    /// Decimal string.
    pub price: String,
    /// Opening stock.
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub critical_stock: i64,
    #[serde(default)]
    pub top_seller: bool,
}

/// Input for [`CatalogService::create_promotion`].
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPromotion {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PromotionKind,
    /// Percentage (`"12.5"`) for PERCENT, amount for FIXED.
    pub value: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default, rename = "products")]
    pub product_ids: Vec<String>,
}

/// A product that needs restocking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct LowStockEntry {
    pub product_id: String,
    pub code: String,
    pub name: String,
    pub stock: i64,
    pub min_stock: i64,
    pub level: StockLevel,
}

#[derive(Debug, Clone)]
pub struct CatalogService {
    db: Database,
}

impl CatalogService {
    pub fn new(db: Database) -> Self {
        CatalogService { db }
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn create_category(&self, name: &str) -> ServiceResult<Category> {
        validate_name("name", name, MAX_CATEGORY_NAME)?;
        let category = self.db.categories().create(name).await?;

        info!(id = %category.id, name = %category.name, "Category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> ServiceResult<Vec<Category>> {
        Ok(self.db.categories().list().await?)
    }

    /// Deletes an unused category.
    ///
    /// The DELETE goes first and the `ON DELETE RESTRICT` key decides, so a
    /// product added concurrently still yields `CONFLICT`.
    ///
    /// ## Errors
    /// `CONFLICT` while any product references it.
    pub async fn delete_category(&self, id: &str) -> ServiceResult<()> {
        let mut tx = self.db.begin().await?;

        match CategoryRepository::delete(&mut tx, id).await {
            Ok(true) => {}
            Ok(false) => return Err(ServiceError::not_found("Category", id)),
            Err(DbError::ForeignKeyViolation { .. }) => {
                let in_use = CategoryRepository::count_products(&mut tx, id).await?;
                return Err(CoreError::Conflict(format!(
                    "Category {} is used by {} products",
                    id, in_use
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit().await?;

        info!(id = %id, "Category deleted");
        Ok(())
    }

    // =========================================================================
    // Products
    // =========================================================================

    /// Creates a product; opening stock goes through the ledger.
    ///
    /// ## Errors
    /// - `VALIDATION_ERROR` for bad code, name, price or thresholds
    /// - `NOT_FOUND` for an unknown category
    /// - `CONFLICT` when the code exists in any letter case
    pub async fn create_product(&self, input: &NewProduct) -> ServiceResult<Product> {
        validate_code(&input.code)?;
        validate_name("name", &input.name, MAX_PRODUCT_NAME)?;
        let price = parse_amount(Some(&input.price), "price")?;
        if input.stock < 0 {
            return Err(ValidationError::MustNotBeNegative {
                field: "stock".to_string(),
            }
            .into());
        }
        validate_stock_thresholds(input.min_stock, input.critical_stock)?;

        if let Some(category_id) = &input.category_id {
            self.require_category(category_id).await?;
        }

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            code: input.code.trim().to_string(),
            name: input.name.trim().to_string(),
            category_id: input.category_id.clone(),
            price_cents: price.cents(),
            stock: 0,
            min_stock: input.min_stock,
            critical_stock: input.critical_stock,
            active: true,
            top_seller: input.top_seller,
            created_at: now,
            updated_at: now,
        };

        let mut tx = self.db.begin().await?;

        ProductRepository::insert(&mut tx, &product).await?;
        if input.stock > 0 {
            InventoryRepository::register_movement(
                &mut tx,
                &product.id,
                MovementType::In,
                input.stock,
                REASON_INITIAL,
            )
            .await?;
        }

        tx.commit().await?;

        info!(id = %product.id, code = %product.code, stock = input.stock, "Product created");

        self.get_product(&product.id).await
    }

    pub async fn get_product(&self, id: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", id))
    }

    /// Looks a product up by code, ignoring letter case.
    pub async fn get_product_by_code(&self, code: &str) -> ServiceResult<Product> {
        self.db
            .products()
            .get_by_code(code)
            .await?
            .ok_or_else(|| ServiceError::not_found("Product", code))
    }

    pub async fn list_products(&self, active_only: bool) -> ServiceResult<Vec<Product>> {
        Ok(self.db.products().list(active_only).await?)
    }

    pub async fn set_product_active(&self, id: &str, active: bool) -> ServiceResult<()> {
        self.db.products().set_active(id, active).await?;
        info!(id = %id, active, "Product availability changed");
        Ok(())
    }

    /// Changes the catalog price and audits `{"price": [old, new]}`.
    ///
    /// Existing sale items keep their snapshot price.
    pub async fn update_price(&self, id: &str, price: &str, actor: &str) -> ServiceResult<Product> {
        validate_name("actor", actor, MAX_NOTE_LENGTH)?;
        let new_price = parse_amount(Some(price), "price")?;
        let current = self.get_product(id).await?;

        if current.price() == new_price {
            return Ok(current);
        }

        let mut tx = self.db.begin().await?;

        ProductRepository::update_price(&mut tx, id, new_price.cents()).await?;
        AuditRepository::record(
            &mut tx,
            actor,
            AuditAction::PriceChange,
            "Product",
            id,
            &json!({ "price": [current.price().to_string(), new_price.to_string()] }),
        )
        .await?;

        tx.commit().await?;

        info!(id = %id, from = %current.price(), to = %new_price, actor = %actor, "Price changed");

        self.get_product(id).await
    }

    /// Active products at or below `min_stock`, emptiest first.
    pub async fn low_stock(&self) -> ServiceResult<Vec<LowStockEntry>> {
        let products = self.db.products().low_stock().await?;

        Ok(products
            .into_iter()
            .map(|p| LowStockEntry {
                level: p.stock_level(),
                product_id: p.id,
                code: p.code,
                name: p.name,
                stock: p.stock,
                min_stock: p.min_stock,
            })
            .collect())
    }

    // =========================================================================
    // Promotions
    // =========================================================================

    /// Creates an active promotion.
    ///
    /// PERCENT values are percentages with up to two decimals (0 to 100);
    /// FIXED values are amounts (≥ 0).
    pub async fn create_promotion(&self, input: &NewPromotion) -> ServiceResult<Promotion> {
        validate_name("name", &input.name, MAX_PRODUCT_NAME)?;
        // Both kinds are stored in hundredths: basis points or cents
        let value = parse_amount(Some(&input.value), "value")?.cents();
        validate_promotion_value(input.kind, value)?;

        if let Some(category_id) = &input.category_id {
            self.require_category(category_id).await?;
        }

        let members: HashSet<String> = input.product_ids.iter().cloned().collect();
        let ids: Vec<String> = members.iter().cloned().collect();
        let found = self.db.products().get_many(&ids).await?;
        if let Some(missing) = ids.iter().find(|id| !found.contains_key(*id)) {
            return Err(ServiceError::not_found("Product", missing));
        }

        let promotion = Promotion {
            id: Uuid::new_v4().to_string(),
            name: input.name.trim().to_string(),
            kind: input.kind,
            value,
            active: true,
            category_id: input.category_id.clone(),
            created_at: Utc::now(),
        };

        let mut tx = self.db.begin().await?;
        PromotionRepository::insert(&mut tx, &promotion, &members).await?;
        tx.commit().await?;

        info!(
            id = %promotion.id,
            kind = ?promotion.kind,
            value = promotion.value,
            members = members.len(),
            "Promotion created"
        );

        Ok(promotion)
    }

    pub async fn set_promotion_active(&self, id: &str, active: bool) -> ServiceResult<()> {
        self.db.promotions().set_active(id, active).await?;
        info!(id = %id, active, "Promotion toggled");
        Ok(())
    }

    pub async fn list_promotions(&self) -> ServiceResult<Vec<Promotion>> {
        Ok(self.db.promotions().list().await?)
    }

    async fn require_category(&self, id: &str) -> ServiceResult<Category> {
        self.db
            .categories()
            .get_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("Category", id))
    }
}
