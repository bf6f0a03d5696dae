//! # Money Module
//!
//! Provides the `Money` type and the `quantize` rounding rule.
//!
//! ## Storage vs. Display
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UNIT PRICES may carry two decimals:     999.50  → Money(99950)        │
//! │                                                                         │
//! │  COMPUTED amounts are whole pesos:                                     │
//! │    promotion discounts, sale totals, preview totals                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │    quantize() → round half away from zero to a multiple of 100         │
//! │                                                                         │
//! │    12.50 → 13      12.49 → 12      -12.50 → -13                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic is integer. `rust_decimal` is only used to parse
//! decimal strings coming in from callers.
//!
//! ## Usage
//! ```rust
//! use caja_core::money::Money;
//!
//! let price = Money::from_units(1000);
//! let discount = price.percent_quantized(1000); // 10.00%
//! assert_eq!(discount, Money::from_units(100));
//! assert_eq!((price - discount).to_string(), "900");
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

/// Hundredths per currency unit.
pub const CENTS_PER_UNIT: i64 = 100;

/// Basis points in 100%.
pub const FULL_PERCENT_BPS: i64 = 10_000;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary amount in hundredths of the currency unit.
///
/// Chilean pesos have no fractional cents in practice; the two decimals exist
/// so catalog prices like `999.50` survive a round trip. Anything computed
/// from them goes through [`Money::quantize`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from hundredths.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole currency units.
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_units(5000).cents(), 500_000);
    /// ```
    #[inline]
    pub const fn from_units(units: i64) -> Self {
        Money(units * CENTS_PER_UNIT)
    }

    /// Returns the value in hundredths.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-unit portion (truncated toward zero).
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0 / CENTS_PER_UNIT
    }

    /// Returns the hundredths portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % CENTS_PER_UNIT).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True when the amount is a whole number of currency units.
    #[inline]
    pub const fn is_whole(&self) -> bool {
        self.0 % CENTS_PER_UNIT == 0
    }

    /// Rounds to the currency unit using round-half-up (ties away from zero).
    ///
    /// ## Rounding Table
    /// ```text
    /// ┌──────────────┬──────────┐
    /// │  input       │  output  │
    /// ├──────────────┼──────────┤
    /// │  0.49        │  0       │
    /// │  0.50        │  1       │
    /// │  999.50      │  1000    │
    /// │  -0.50       │  -1      │
    /// │  -12.49      │  -12     │
    /// └──────────────┴──────────┘
    /// ```
    ///
    /// ```rust
    /// use caja_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(99950).quantize(), Money::from_units(1000));
    /// assert_eq!(Money::from_cents(-50).quantize(), Money::from_units(-1));
    /// ```
    #[inline]
    pub const fn quantize(self) -> Self {
        Money(round_half_away(self.0 as i128, CENTS_PER_UNIT as i128) as i64 * CENTS_PER_UNIT)
    }

    /// Computes `self × bps / 10000`, quantized to the currency unit.
    ///
    /// The product is rounded once, from the exact rational value, so a
    /// 12.5% discount on 1000.00 gives 125 and never 124.
    ///
    /// ## Arguments
    /// * `bps` - Percentage in basis points (1000 = 10.00%)
    pub fn percent_quantized(&self, bps: i64) -> Money {
        // cents × bps / 10000 gives cents; dividing by another 100 gives units
        let numerator = self.0 as i128 * bps as i128;
        let denominator = FULL_PERCENT_BPS as i128 * CENTS_PER_UNIT as i128;
        Money::from_units(round_half_away(numerator, denominator) as i64)
    }

    /// Multiplies money by a quantity. `None` on overflow.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Adds two amounts. `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Self> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Parses a decimal string such as `"4800"` or `"999.50"`.
    ///
    /// More than two decimals are rounded half away from zero. Signs are
    /// accepted here; callers that need a non-negative amount use
    /// [`crate::validation::parse_amount`].
    pub fn parse_decimal(raw: &str, field: &str) -> Result<Money, ValidationError> {
        let raw = raw.trim();

        if raw.is_empty() {
            return Err(ValidationError::Required {
                field: field.to_string(),
            });
        }

        let invalid = || ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must be a decimal number".to_string(),
        };

        let value = Decimal::from_str(raw).map_err(|_| invalid())?;
        let cents = value
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
            .checked_mul(Decimal::from(CENTS_PER_UNIT))
            .and_then(|d| d.to_i64())
            .ok_or_else(invalid)?;

        Ok(Money(cents))
    }
}

/// Integer division rounding ties away from zero. `denominator` must be > 0.
const fn round_half_away(numerator: i128, denominator: i128) -> i128 {
    if numerator >= 0 {
        (2 * numerator + denominator) / (2 * denominator)
    } else {
        -((-2 * numerator + denominator) / (2 * denominator))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Plain decimal string, the wire format for amounts.
///
/// Whole amounts print without decimals (`"1000"`), others with exactly two
/// (`"999.50"`).
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        if self.is_whole() {
            write!(f, "{}{}", sign, self.units().abs())
        } else {
            write!(f, "{}{}.{:02}", sign, self.units().abs(), self.cents_part())
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
