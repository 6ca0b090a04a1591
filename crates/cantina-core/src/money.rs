//! # Money Module
//!
//! Integer-cents monetary values.
//!
//! Stock *quantities* are real numbers (grams, milliliters) and may be
//! fractional; stock *value* is always whole cents on an `i64`. Floats
//! never hold currency: `0.1 + 0.2 ≠ 0.3` is exactly the class of bug a
//! valuation column must not have. The one place quantities and money
//! meet - valuing an effective stock level at a per-base-unit cost -
//! rounds once, in [`Money::times_quantity`].
//!
//! ## Usage
//! ```rust
//! use cantina_core::money::Money;
//!
//! // Cost of 2 cents per milliliter
//! let unit_cost = Money::from_cents(2);
//!
//! // Value of 1337.5 ml on the shelf
//! let value = unit_cost.times_quantity(1337.5);
//! assert_eq!(value.cents(), 2675);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Signed so write-offs and corrections can go negative; a zero-cost
/// newtype over `i64` with full serde support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Wraps a cent amount.
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// The cent amount.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Zero value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Whether the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Multiplies a per-base-unit cost by a (possibly fractional) quantity,
    /// rounding half-away-from-zero to whole cents.
    ///
    /// This is the single rounding point in stock valuation; aggregating
    /// already-rounded line values never compounds drift.
    pub fn times_quantity(&self, quantity: f64) -> Money {
        Money((self.0 as f64 * quantity).round() as i64)
    }

    /// Saturating sum of an iterator of values.
    pub fn sum<I: IntoIterator<Item = Money>>(iter: I) -> Money {
        iter.into_iter()
            .fold(Money::zero(), |acc, m| Money(acc.0.saturating_add(m.0)))
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

// =============================================================================
// Display
// =============================================================================

/// Plain decimal without a currency symbol ("10.99"); symbols and locale
/// belong to the display layer.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{}{}.{:02}", sign, abs / 100, abs % 100)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
