//! # Inventory Arithmetic
//!
//! Stock math for the inventory ledger. The ledger itself (movement rows and
//! the stock update inside the caller's transaction) lives in caja-db; this
//! module only decides the resulting stock.
//!
//! ```text
//! IN   stock + max(0, qty)
//! OUT  max(0, stock - max(0, qty))     sales never fail on shortfall
//! ADJ  max(0, stock + qty)             qty may be negative
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{MovementType, Product};

impl MovementType {
    /// Stock after applying a movement of `qty` to `stock`.
    ///
    /// The result is never negative, whatever the inputs.
    ///
    /// ```rust
    /// use caja_core::MovementType;
    ///
    /// assert_eq!(MovementType::Out.apply(3, 5), 0);
    /// assert_eq!(MovementType::Adj.apply(10, -4), 6);
    /// ```
    pub fn apply(self, stock: i64, qty: i64) -> i64 {
        let next = match self {
            MovementType::In => stock.saturating_add(qty.max(0)),
            MovementType::Out => stock.saturating_sub(qty.max(0)),
            MovementType::Adj => stock.saturating_add(qty),
        };
        next.max(0)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "IN",
            MovementType::Out => "OUT",
            MovementType::Adj => "ADJ",
        }
    }
}

// =============================================================================
// Stock Level
// =============================================================================

/// Shelf status derived from a product's thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockLevel {
    /// Above `min_stock`.
    Ok,
    /// At or below `min_stock`.
    Low,
    /// At or below `critical_stock`.
    Critical,
    /// Nothing on hand.
    Out,
}

impl StockLevel {
    pub fn classify(stock: i64, min_stock: i64, critical_stock: i64) -> Self {
        if stock <= 0 {
            StockLevel::Out
        } else if stock <= critical_stock {
            StockLevel::Critical
        } else if stock <= min_stock {
            StockLevel::Low
        } else {
            StockLevel::Ok
        }
    }

    /// True for anything that needs restocking.
    pub fn needs_attention(&self) -> bool {
        !matches!(self, StockLevel::Ok)
    }
}

impl Product {
    pub fn stock_level(&self) -> StockLevel {
        StockLevel::classify(self.stock, self.min_stock, self.critical_stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_ignores_negative_qty() {
        assert_eq!(MovementType::In.apply(5, 3), 8);
        assert_eq!(MovementType::In.apply(5, -3), 5);
    }

    #[test]
    fn test_out_clamps_at_zero() {
        assert_eq!(MovementType::Out.apply(5, 3), 2);
        assert_eq!(MovementType::Out.apply(5, 5), 0);
        assert_eq!(MovementType::Out.apply(2, 7), 0);
        assert_eq!(MovementType::Out.apply(5, -3), 5);
    }

    #[test]
    fn test_adj_is_signed_and_clamped() {
        assert_eq!(MovementType::Adj.apply(5, 4), 9);
        assert_eq!(MovementType::Adj.apply(5, -4), 1);
        assert_eq!(MovementType::Adj.apply(5, -40), 0);
    }

    #[test]
    fn test_stock_never_negative_over_sequences() {
        let moves = [
            (MovementType::Out, 4),
            (MovementType::Adj, -10),
            (MovementType::In, 3),
            (MovementType::Out, 10),
            (MovementType::Adj, 2),
            (MovementType::Out, 1),
            (MovementType::Adj, -1),
            (MovementType::In, -5),
        ];

        let mut stock = 2;
        for (kind, qty) in moves {
            stock = kind.apply(stock, qty);
            assert!(stock >= 0, "{:?} {} left stock at {}", kind, qty, stock);
        }
        assert_eq!(stock, 0);
    }

    #[test]
    fn test_stock_level_classify() {
        assert_eq!(StockLevel::classify(0, 10, 3), StockLevel::Out);
        assert_eq!(StockLevel::classify(2, 10, 3), StockLevel::Critical);
        assert_eq!(StockLevel::classify(3, 10, 3), StockLevel::Critical);
        assert_eq!(StockLevel::classify(10, 10, 3), StockLevel::Low);
        assert_eq!(StockLevel::classify(11, 10, 3), StockLevel::Ok);
        assert!(!StockLevel::Ok.needs_attention());
        assert!(StockLevel::Critical.needs_attention());
    }
}
