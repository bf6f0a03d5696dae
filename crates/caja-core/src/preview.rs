//! # Sale Preview
//!
//! Dry-run pricing of candidate lines. Nothing here persists; callers load
//! the products and the active promotion set once and pass them in.
//!
//! Invalid candidates are dropped rather than failing the batch:
//! missing product id, unknown product, a `qty` outside `1..=999`, and a
//! unit price that is missing, unparseable, not positive or above the
//! accepted maximum. These are the bounds checkout enforces.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::promotion::PromotionSet;
use crate::types::Product;
use crate::validation::{validate_amount, validate_quantity};

/// A candidate line as sent by the register UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PreviewRequestLine {
    #[serde(default, rename = "product")]
    pub product_id: Option<String>,

    #[serde(default)]
    pub qty: i64,

    #[serde(default)]
    pub unit_price: Option<String>,
}

/// One priced line. Amounts are decimal strings of quantized values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PreviewItem {
    #[serde(rename = "product")]
    pub product_id: String,
    pub name: String,
    pub qty: i64,
    pub unit_price: String,
    pub discount_unit: String,
    pub line_total: String,
}

/// Per-line breakdown plus batch totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalePreview {
    pub items: Vec<PreviewItem>,

    #[serde(rename = "total_bruto")]
    pub gross_total: String,

    #[serde(rename = "total_descuento")]
    pub discount_total: String,

    #[serde(rename = "total_neto")]
    pub net_total: String,
}

/// Prices the candidate lines against `products` and `promotions`.
///
/// Gross, discount and net totals are accumulated unrounded and quantized
/// independently at the end.
pub fn compute_preview(
    lines: &[PreviewRequestLine],
    products: &HashMap<String, Product>,
    promotions: &PromotionSet,
) -> SalePreview {
    let mut items = Vec::with_capacity(lines.len());
    let mut gross = Money::zero();
    let mut discount = Money::zero();
    let mut net = Money::zero();

    for line in lines {
        let Some(product_id) = line.product_id.as_deref().filter(|id| !id.trim().is_empty()) else {
            continue;
        };
        if validate_quantity(line.qty).is_err() {
            continue;
        }
        let Some(unit_price) = line
            .unit_price
            .as_deref()
            .and_then(|raw| Money::parse_decimal(raw, "unit_price").ok())
            .filter(|price| price.is_positive() && validate_amount("unit_price", *price).is_ok())
        else {
            continue;
        };
        let Some(product) = products.get(product_id) else {
            continue;
        };

        let discount_unit = promotions.best_unit_discount(product, unit_price);
        let Some((line_gross, line_discount, line_net)) =
            line_amounts(unit_price, discount_unit, line.qty)
        else {
            continue;
        };
        let (Some(next_gross), Some(next_discount), Some(next_net)) = (
            gross.checked_add(line_gross),
            discount.checked_add(line_discount),
            net.checked_add(line_net),
        ) else {
            continue;
        };

        gross = next_gross;
        discount = next_discount;
        net = next_net;

        items.push(PreviewItem {
            product_id: product_id.to_string(),
            name: product.name.clone(),
            qty: line.qty,
            unit_price: unit_price.quantize().to_string(),
            discount_unit: discount_unit.quantize().to_string(),
            line_total: line_net.quantize().to_string(),
        });
    }

    SalePreview {
        items,
        gross_total: gross.quantize().to_string(),
        discount_total: discount.quantize().to_string(),
        net_total: net.quantize().to_string(),
    }
}

/// Gross, discount and net of one line, unrounded.
fn line_amounts(unit_price: Money, discount_unit: Money, qty: i64) -> Option<(Money, Money, Money)> {
    Some((
        unit_price.multiply_quantity(qty)?,
        discount_unit.multiply_quantity(qty)?,
        (unit_price - discount_unit).multiply_quantity(qty)?,
    ))
}
