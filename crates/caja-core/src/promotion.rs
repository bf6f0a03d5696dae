//! # Promotion Engine
//!
//! Pure discount math over a pre-loaded set of active promotions.
//!
//! ## Best Unit Discount
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  product (id, category) + unit price                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  for each promotion in the set:                                        │
//! │       ├── inactive?                         → 0                        │
//! │       ├── category match OR explicit member? no → 0                     │
//! │       ├── PERCENT  → quantize(price × value / 100)                     │
//! │       └── FIXED    → quantize(value)                                   │
//! │                      then clamp to [0, unit price]                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  max over all promotions (they never stack)                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The set is built once per batch (checkout, preview, recalculation) and
//! passed by reference; membership is a `HashSet` lookup per promotion.

use std::collections::HashSet;

use crate::money::Money;
use crate::types::{Product, Promotion, PromotionKind};

// =============================================================================
// Active Promotion
// =============================================================================

/// A promotion together with its resolved explicit product members.
#[derive(Debug, Clone)]
pub struct ActivePromotion {
    pub promotion: Promotion,
    pub product_ids: HashSet<String>,
}

impl ActivePromotion {
    pub fn new(promotion: Promotion, product_ids: HashSet<String>) -> Self {
        ActivePromotion {
            promotion,
            product_ids,
        }
    }

    /// Category match OR explicit membership. Ignores `active`.
    pub fn applies_to(&self, product: &Product) -> bool {
        let category_match = match (&self.promotion.category_id, &product.category_id) {
            (Some(promo_category), Some(product_category)) => promo_category == product_category,
            _ => false,
        };

        category_match || self.product_ids.contains(&product.id)
    }

    /// Discount this promotion alone grants on one unit of `product`.
    pub fn unit_discount(&self, product: &Product, unit_price: Money) -> Money {
        if !self.promotion.active || !self.applies_to(product) {
            return Money::zero();
        }

        let raw = match self.promotion.kind {
            PromotionKind::Percent => unit_price.percent_quantized(self.promotion.value),
            PromotionKind::Fixed => Money::from_cents(self.promotion.value).quantize(),
        };

        clamp_discount(raw, unit_price)
    }
}

/// Keeps a discount within `[0, unit_price]`.
#[inline]
fn clamp_discount(discount: Money, unit_price: Money) -> Money {
    discount.min(unit_price).max(Money::zero())
}

// =============================================================================
// Promotion Set
// =============================================================================

/// Snapshot of the promotions in force for one batch operation.
#[derive(Debug, Clone, Default)]
pub struct PromotionSet {
    promotions: Vec<ActivePromotion>,
}

impl PromotionSet {
    pub fn new(promotions: Vec<ActivePromotion>) -> Self {
        PromotionSet { promotions }
    }

    pub fn empty() -> Self {
        PromotionSet::default()
    }

    pub fn is_empty(&self) -> bool {
        self.promotions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.promotions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ActivePromotion> {
        self.promotions.iter()
    }

    /// See [`best_unit_discount`].
    pub fn best_unit_discount(&self, product: &Product, unit_price: Money) -> Money {
        best_unit_discount(product, unit_price, self)
    }
}

/// Largest single-promotion discount on one unit of `product`.
///
/// Never exceeds `unit_price` and never goes below zero. With an empty set
/// the discount is zero.
pub fn best_unit_discount(product: &Product, unit_price: Money, promotions: &PromotionSet) -> Money {
    promotions
        .iter()
        .map(|promo| promo.unit_discount(product, unit_price))
        .max()
        .unwrap_or_else(Money::zero)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, category: Option<&str>, price_units: i64) -> Product {
        Product {
            id: id.to_string(),
            code: format!("C-{id}"),
            name: format!("Product {id}"),
            category_id: category.map(str::to_string),
            price_cents: Money::from_units(price_units).cents(),
            stock: 10,
            min_stock: 0,
            critical_stock: 0,
            active: true,
            top_seller: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn promo(kind: PromotionKind, value: i64, category: Option<&str>, members: &[&str]) -> ActivePromotion {
        ActivePromotion::new(
            Promotion {
                id: format!("promo-{value}"),
                name: "promo".to_string(),
                kind,
                value,
                active: true,
                category_id: category.map(str::to_string),
                created_at: Utc::now(),
            },
            members.iter().map(|m| m.to_string()).collect(),
        )
    }

    #[test]
    fn test_no_promotions_means_no_discount() {
        let a = product("a", Some("x"), 1000);
        assert_eq!(best_unit_discount(&a, a.price(), &PromotionSet::empty()), Money::zero());
    }

    #[test]
    fn test_percent_by_category() {
        let a = product("a", Some("x"), 1000);
        let set = PromotionSet::new(vec![promo(PromotionKind::Percent, 1000, Some("x"), &[])]);

        assert_eq!(set.best_unit_discount(&a, a.price()), Money::from_units(100));
    }

    #[test]
    fn test_explicit_member_without_category() {
        let a = product("a", None, 1000);
        let b = product("b", None, 1000);
        let set = PromotionSet::new(vec![promo(PromotionKind::Fixed, 25_000, None, &["a"])]);

        assert_eq!(set.best_unit_discount(&a, a.price()), Money::from_units(250));
        assert_eq!(set.best_unit_discount(&b, b.price()), Money::zero());
    }

    #[test]
    fn test_best_of_overlapping_promotions_does_not_stack() {
        let a = product("a", Some("x"), 1000);
        let set = PromotionSet::new(vec![
            promo(PromotionKind::Percent, 1000, Some("x"), &[]),
            promo(PromotionKind::Fixed, 15_000, None, &["a"]),
        ]);

        assert_eq!(set.best_unit_discount(&a, a.price()), Money::from_units(150));
    }

    #[test]
    fn test_inactive_promotion_contributes_nothing() {
        let a = product("a", Some("x"), 1000);
        let mut inactive = promo(PromotionKind::Percent, 5000, Some("x"), &[]);
        inactive.promotion.active = false;
        let set = PromotionSet::new(vec![inactive]);

        assert_eq!(set.best_unit_discount(&a, a.price()), Money::zero());
    }

    #[test]
    fn test_fixed_discount_clamped_to_price() {
        let a = product("a", None, 100);
        let set = PromotionSet::new(vec![promo(PromotionKind::Fixed, 50_000, None, &["a"])]);

        assert_eq!(set.best_unit_discount(&a, a.price()), a.price());
    }

    #[test]
    fn test_full_percent_on_fractional_price_never_exceeds_price() {
        let a = product("a", None, 0);
        let price = Money::from_cents(99_950);
        let set = PromotionSet::new(vec![promo(PromotionKind::Percent, 10_000, None, &["a"])]);

        let discount = set.best_unit_discount(&a, price);
        assert_eq!(discount, price);
    }

    #[test]
    fn test_discount_never_exceeds_price_for_many_inputs() {
        let a = product("a", Some("x"), 0);
        let set = PromotionSet::new(vec![
            promo(PromotionKind::Percent, 3333, Some("x"), &[]),
            promo(PromotionKind::Percent, 10_000, None, &["a"]),
            promo(PromotionKind::Fixed, 77_750, Some("x"), &[]),
        ]);

        for cents in [0, 1, 49, 50, 99, 150, 99_950, 100_000, 12_345_678] {
            let price = Money::from_cents(cents);
            let discount = set.best_unit_discount(&a, price);
            assert!(discount <= price, "discount {discount} > price {price}");
            assert!(!discount.is_negative());
        }
    }

    #[test]
    fn test_unit_price_override_is_used() {
        let a = product("a", Some("x"), 1000);
        let set = PromotionSet::new(vec![promo(PromotionKind::Percent, 1000, Some("x"), &[])]);

        assert_eq!(set.best_unit_discount(&a, Money::from_units(800)), Money::from_units(80));
    }
}
