//! # Stock Ledger
//!
//! Per-(item, location) stock math: the dual closed/open representation and
//! the open-package consumption resolver.
//!
//! ## The Dual Representation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │            LocationStock for "Gin 750ml" at "Main Bar"                  │
//! │                                                                         │
//! │   closed_units: 3          open_packages:                               │
//! │   ┌────┐ ┌────┐ ┌────┐     ┌──────────────┐  ┌──────────────┐          │
//! │   │####│ │####│ │####│     │ cap 750      │  │ cap 750      │          │
//! │   │####│ │####│ │####│     │ remaining 120│  │ remaining 600│          │
//! │   └────┘ └────┘ └────┘     └──────────────┘  └──────────────┘          │
//! │                                                                         │
//! │   effective stock = 3 × 750 + 120 + 600 = 2970 ml                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Draw-Down Order
//! Consumption drains open packages **remaining-ascending** (near-empty
//! first), then opens closed units one at a time. The ordering is a fixed
//! behavioral contract, not an implementation detail: it keeps the number
//! of simultaneously open packages minimal and makes concurrent terminals
//! converge on the same shelf state.
//!
//! ## Plan-Then-Apply
//! [`plan_consumption`] computes the complete outcome before anything is
//! applied. A shortfall returns an error and the input stock is untouched -
//! there is no partial decrement to roll back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;
use crate::types::OpenPackage;
use crate::QUANTITY_EPSILON;

// =============================================================================
// Location Stock
// =============================================================================

/// The per-(item, location) ledger row: sealed packages plus zero or more
/// partially-consumed open packages.
///
/// Mutated exclusively through [`plan_consumption`]/[`deposit`]; UI code and
/// repositories never edit the fields directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LocationStock {
    /// Count of sealed packages. Invariant: `closed_units ≥ 0`.
    pub closed_units: i64,

    /// Active open packages, in opening order. Invariant: every package has
    /// `0 < remaining ≤ capacity` (fully drained packages are pruned).
    pub open_packages: Vec<OpenPackage>,
}

impl LocationStock {
    /// An empty shelf.
    pub fn empty() -> Self {
        LocationStock::default()
    }

    /// Sum of open-package remainders, in base units.
    pub fn open_remaining(&self) -> f64 {
        self.open_packages.iter().map(|p| p.remaining).sum()
    }

    /// Effective available stock in base units:
    /// `closed_units × package_size + Σ open.remaining`.
    pub fn effective_stock(&self, package_size: f64) -> f64 {
        self.closed_units as f64 * package_size + self.open_remaining()
    }

    /// Whether the representation invariants hold.
    ///
    /// Checked by tests and debug assertions; production code maintains
    /// them by construction.
    pub fn invariants_hold(&self) -> bool {
        self.closed_units >= 0
            && self.open_packages.iter().all(|p| {
                p.remaining > 0.0 && p.remaining <= p.capacity + QUANTITY_EPSILON
            })
    }
}

// =============================================================================
// Consumption Plan
// =============================================================================

/// Outcome of planning a consumption against one location's stock.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumptionPlan {
    /// The stock state after the draw. Newly opened packages carry
    /// `opened_at: None`; the caller stamps them when applying the plan.
    pub after: LocationStock,

    /// Exactly the requested amount on success, in base units.
    pub drawn: f64,

    /// Closed units opened to satisfy the request.
    pub packages_opened: i64,

    /// Open packages fully drained (and pruned) by the request.
    pub packages_drained: usize,
}

/// A consumption the location cannot cover.
///
/// Carries the numbers the caller needs to build a
/// [`CoreError::InsufficientStock`] with item context attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shortfall {
    pub available: f64,
    pub requested: f64,
}

impl Shortfall {
    /// Attaches the item id this shortfall occurred for.
    pub fn for_item(self, item_id: impl Into<String>) -> CoreError {
        CoreError::InsufficientStock {
            item_id: item_id.into(),
            available: self.available,
            requested: self.requested,
        }
    }
}

/// Plans the removal of `required` base units from a location.
///
/// ## Algorithm
/// 1. Drain existing open packages, remaining-ascending (stable for ties).
/// 2. Packages reaching zero are pruned from the active set.
/// 3. If still short, open closed units one at a time (each contributes
///    `package_size` base units) and keep draining.
/// 4. If closed units run out first, the whole plan fails - the input is
///    never modified.
///
/// ## Example
/// ```rust
/// use cantina_core::ledger::{plan_consumption, LocationStock};
/// use cantina_core::types::OpenPackage;
///
/// let stock = LocationStock {
///     closed_units: 0,
///     open_packages: vec![
///         OpenPackage::new(100.0, 5.0, None),
///         OpenPackage::new(100.0, 20.0, None),
///         OpenPackage::new(100.0, 2.0, None),
///     ],
/// };
///
/// let plan = plan_consumption(&stock, 100.0, 4.0).unwrap();
/// // The near-empty package (2.0) drains first, the next-smallest covers
/// // the rest; the fullest package is untouched.
/// assert_eq!(plan.after.open_packages.len(), 2);
/// assert_eq!(plan.after.open_packages[0].remaining, 3.0);
/// assert_eq!(plan.after.open_packages[1].remaining, 20.0);
/// ```
pub fn plan_consumption(
    stock: &LocationStock,
    package_size: f64,
    required: f64,
) -> Result<ConsumptionPlan, Shortfall> {
    let available = stock.effective_stock(package_size);
    if required > available + QUANTITY_EPSILON {
        return Err(Shortfall {
            available,
            requested: required,
        });
    }

    let mut open = stock.open_packages.clone();
    // Stable sort: ties keep opening order, so equal-remaining packages
    // drain oldest-first.
    open.sort_by(|a, b| {
        a.remaining
            .partial_cmp(&b.remaining)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut need = required;
    let mut drained = 0usize;

    for pkg in &mut open {
        if need <= QUANTITY_EPSILON {
            break;
        }
        let draw = pkg.remaining.min(need);
        pkg.remaining -= draw;
        need -= draw;
        if pkg.remaining <= QUANTITY_EPSILON {
            drained += 1;
        }
    }
    open.retain(|p| p.remaining > QUANTITY_EPSILON);

    let mut closed = stock.closed_units;
    let mut opened = 0i64;

    while need > QUANTITY_EPSILON {
        if closed == 0 {
            // Unreachable given the up-front effective-stock check; kept as
            // a hard stop so a bad package_size can never drive closed
            // units negative.
            return Err(Shortfall {
                available,
                requested: required,
            });
        }
        closed -= 1;
        opened += 1;

        let draw = package_size.min(need);
        need -= draw;

        let remaining = package_size - draw;
        if remaining > QUANTITY_EPSILON {
            open.push(OpenPackage::new(package_size, remaining, None));
        } else {
            drained += 1;
        }
    }

    Ok(ConsumptionPlan {
        after: LocationStock {
            closed_units: closed,
            open_packages: open,
        },
        drawn: required,
        packages_opened: opened,
        packages_drained: drained,
    })
}

// =============================================================================
// Deposit
// =============================================================================

/// Outcome of adding base units to a location.
#[derive(Debug, Clone, PartialEq)]
pub struct DepositOutcome {
    pub after: LocationStock,

    /// Whole sealed packages added.
    pub closed_added: i64,

    /// Non-whole remainder that became a new open package, if any.
    pub remainder: f64,
}

/// Adds `amount` base units to a location.
///
/// Whole multiples of `package_size` arrive as sealed packages; a
/// fractional remainder becomes one new open package (this is how the
/// receiving side of a transfer represents a drawn-down quantity). The
/// consumption resolver is never involved in additions.
pub fn deposit(
    stock: &LocationStock,
    package_size: f64,
    amount: f64,
    opened_at: Option<DateTime<Utc>>,
) -> DepositOutcome {
    let whole = ((amount + QUANTITY_EPSILON) / package_size).floor() as i64;
    let remainder = amount - whole as f64 * package_size;

    let mut after = stock.clone();
    after.closed_units += whole;

    let remainder = if remainder > QUANTITY_EPSILON {
        after
            .open_packages
            .push(OpenPackage::new(package_size, remainder, opened_at));
        remainder
    } else {
        0.0
    };

    DepositOutcome {
        after,
        closed_added: whole,
        remainder,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn open(capacity: f64, remaining: f64) -> OpenPackage {
        OpenPackage::new(capacity, remaining, None)
    }

    #[test]
    fn test_effective_stock() {
        let stock = LocationStock {
            closed_units: 3,
            open_packages: vec![open(750.0, 120.0), open(750.0, 600.0)],
        };
        assert!((stock.effective_stock(750.0) - 2970.0).abs() < QUANTITY_EPSILON);
        assert!(stock.invariants_hold());
    }

    #[test]
    fn test_drains_smallest_open_package_first() {
        // {5, 20, 2} with a request of 4 must drain the 2-package fully,
        // take 2 from the 5-package, and never touch the 20-package.
        let stock = LocationStock {
            closed_units: 0,
            open_packages: vec![open(100.0, 5.0), open(100.0, 20.0), open(100.0, 2.0)],
        };

        let plan = plan_consumption(&stock, 100.0, 4.0).unwrap();
        assert_eq!(plan.drawn, 4.0);
        assert_eq!(plan.packages_drained, 1);
        assert_eq!(plan.packages_opened, 0);

        let remainders: Vec<f64> = plan.after.open_packages.iter().map(|p| p.remaining).collect();
        assert_eq!(remainders, vec![3.0, 20.0]);
        assert!(plan.after.invariants_hold());
    }

    #[test]
    fn test_opens_closed_units_when_open_exhausted() {
        let stock = LocationStock {
            closed_units: 2,
            open_packages: vec![open(100.0, 30.0)],
        };

        // 30 from the open package + a full fresh 100 + 20 from a second
        let plan = plan_consumption(&stock, 100.0, 150.0).unwrap();
        assert_eq!(plan.after.closed_units, 0);
        assert_eq!(plan.packages_opened, 2);
        assert_eq!(plan.after.open_packages.len(), 1);
        assert!((plan.after.open_packages[0].remaining - 80.0).abs() < QUANTITY_EPSILON);
        assert!((plan.after.effective_stock(100.0) - 80.0).abs() < QUANTITY_EPSILON);
    }

    #[test]
    fn test_exact_drain_prunes_package() {
        let stock = LocationStock {
            closed_units: 0,
            open_packages: vec![open(100.0, 40.0)],
        };

        let plan = plan_consumption(&stock, 100.0, 40.0).unwrap();
        assert!(plan.after.open_packages.is_empty());
        assert_eq!(plan.packages_drained, 1);
        assert_eq!(plan.after.closed_units, 0);
    }

    #[test]
    fn test_shortfall_leaves_input_untouched() {
        let stock = LocationStock {
            closed_units: 1,
            open_packages: vec![],
        };

        let err = plan_consumption(&stock, 10.0, 15.0).unwrap_err();
        assert_eq!(err.available, 10.0);
        assert_eq!(err.requested, 15.0);

        // The input is immutable by construction; assert anyway.
        assert_eq!(stock.closed_units, 1);
        assert!(stock.open_packages.is_empty());
    }

    #[test]
    fn test_shortfall_attaches_item_context() {
        let err = Shortfall {
            available: 10.0,
            requested: 15.0,
        }
        .for_item("item-1");
        assert!(matches!(
            err,
            CoreError::InsufficientStock { available, requested, .. }
                if available == 10.0 && requested == 15.0
        ));
    }

    #[test]
    fn test_equal_remainders_drain_oldest_first() {
        let mut first = open(100.0, 10.0);
        first.opened_at = Some(chrono::Utc::now());
        let stock = LocationStock {
            closed_units: 0,
            open_packages: vec![first.clone(), open(100.0, 10.0)],
        };

        let plan = plan_consumption(&stock, 100.0, 10.0).unwrap();
        // Stable sort: the older (first-listed) package drained.
        assert_eq!(plan.after.open_packages.len(), 1);
        assert!(plan.after.open_packages[0].opened_at.is_none());
    }

    #[test]
    fn test_deposit_whole_and_fractional() {
        let stock = LocationStock::empty();

        let whole = deposit(&stock, 24.0, 48.0, None);
        assert_eq!(whole.closed_added, 2);
        assert_eq!(whole.after.closed_units, 2);
        assert!(whole.after.open_packages.is_empty());

        let fractional = deposit(&whole.after, 24.0, 30.0, None);
        assert_eq!(fractional.closed_added, 1);
        assert_eq!(fractional.after.closed_units, 3);
        assert_eq!(fractional.after.open_packages.len(), 1);
        assert!((fractional.after.open_packages[0].remaining - 6.0).abs() < QUANTITY_EPSILON);
        assert!((fractional.remainder - 6.0).abs() < QUANTITY_EPSILON);
    }

    #[test]
    fn test_withdraw_then_deposit_preserves_total() {
        // A transfer = plan_consumption at the source + deposit at the
        // destination; the combined effective stock is conserved.
        let source = LocationStock {
            closed_units: 2,
            open_packages: vec![open(750.0, 200.0)],
        };
        let dest = LocationStock::empty();

        let before = source.effective_stock(750.0) + dest.effective_stock(750.0);

        let plan = plan_consumption(&source, 750.0, 900.0).unwrap();
        let deposited = deposit(&dest, 750.0, plan.drawn, None);

        let after =
            plan.after.effective_stock(750.0) + deposited.after.effective_stock(750.0);
        assert!((before - after).abs() < QUANTITY_EPSILON);
    }
}
