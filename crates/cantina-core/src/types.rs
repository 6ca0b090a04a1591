//! # Domain Types
//!
//! Core domain types used throughout Cantina.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ InventoryItem   │   │ StorageLocation │   │    Movement     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  id (UUID)      │       │
//! │  │  sku (business) │   │  name           │   │  item_id (FK)   │       │
//! │  │  package_size   │   │  location_type  │   │  from/to (FK?)  │       │
//! │  │  current_stock  │   │  is_default     │   │  quantity       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Menu       │   │    MenuRule     │   │   MenuProduct   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  priority       │   │  rule_type      │   │  price_override │       │
//! │  │  is_fallback    │   │  config (JSON)  │   │  sort_order     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID where one exists: (sku, location name, menu name)
//!
//! ## Quantity Convention
//! Every stock quantity in the system - movement quantities, audit deltas,
//! `current_stock`, open package `remaining` - is expressed in **base units**
//! (grams, milliliters, or pieces). Callers working in whole packages
//! multiply by `package_size` before calling in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Unit Type
// =============================================================================

/// The base unit an inventory item is tracked in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    /// Discrete pieces (bottles sold whole, cans, pastries).
    Count,
    /// Weight in grams (coffee beans, flour).
    Gram,
    /// Volume in milliliters (spirits, syrups, kegs).
    Milliliter,
}

// =============================================================================
// Inventory Item
// =============================================================================

/// A store-scoped inventory catalog entry.
///
/// ## The `current_stock` Invariant
/// `current_stock` is a denormalized total maintained by every movement:
/// at any instant it equals the sum over all locations of
/// `closed_units × package_size + Σ open_package.remaining`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Store (tenant) this item belongs to.
    pub store_id: String,

    /// Stock Keeping Unit - business identifier.
    pub sku: String,

    /// Display name.
    pub name: String,

    /// Base unit this item is measured in.
    pub unit_type: UnitType,

    /// Base units per sealed package (e.g. 750 for a 750 ml bottle).
    pub package_size: f64,

    /// Cost per base unit, in cents.
    pub cost_cents: i64,

    /// Sale price per base unit, in cents (None for ingredients never sold).
    pub sale_price_cents: Option<i64>,

    /// Denormalized total across all locations, in base units.
    pub current_stock: f64,

    /// Reorder threshold, in base units.
    pub min_stock: f64,

    /// Preferred/most recent supplier.
    pub supplier_id: Option<String>,

    /// Unit cost of the most recent purchase, in cents.
    pub last_purchase_price_cents: Option<i64>,

    /// Whether the item is active (soft delete).
    ///
    /// Items referenced by historical movements are never physically
    /// deleted - they are deactivated instead.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    /// Whether the item's total stock has fallen to or below its threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.min_stock > 0.0 && self.current_stock <= self.min_stock
    }
}

// =============================================================================
// Storage Location
// =============================================================================

/// Kind of physical storage place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    /// Back-of-house bulk storage.
    Warehouse,
    /// A bar/counter where stock is consumed during service.
    PointOfSale,
    /// Kitchen storage.
    Kitchen,
}

/// A store-scoped named place where stock physically resides.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StorageLocation {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub location_type: LocationType,

    /// Exactly one location per store holds this flag; the first location
    /// created for a store gets it automatically.
    pub is_default: bool,

    /// Locations with stock rows or movement history are not deletable.
    pub is_deletable: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Open Package
// =============================================================================

/// One partially-consumed sealed unit.
///
/// Created when a closed unit is opened (explicitly, or implicitly when a
/// consumption cannot be covered by open packages alone). `remaining`
/// decreases monotonically; at zero the package leaves the active set and
/// is never reused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OpenPackage {
    /// Total capacity in base units, fixed at open time from the item's
    /// package size.
    pub capacity: f64,

    /// Base units left. Invariant: `0 ≤ remaining ≤ capacity`.
    pub remaining: f64,

    /// When the package was opened.
    #[ts(as = "Option<String>")]
    pub opened_at: Option<DateTime<Utc>>,
}

impl OpenPackage {
    pub fn new(capacity: f64, remaining: f64, opened_at: Option<DateTime<Utc>>) -> Self {
        OpenPackage {
            capacity,
            remaining,
            opened_at,
        }
    }

    /// Percent remaining for display, capped at 100.
    ///
    /// Read-only derived value; never feeds back into `remaining`.
    pub fn percent_remaining(&self) -> f64 {
        if self.capacity <= 0.0 {
            return 0.0;
        }
        (self.remaining / self.capacity * 100.0).min(100.0)
    }
}

// =============================================================================
// Movement
// =============================================================================

/// The four ledger mutation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// External source → location. Adds sealed packages.
    Purchase,
    /// Location → void (waste, breakage, theft).
    Loss,
    /// ± correction at one location.
    Adjustment,
    /// Location → location.
    Transfer,
}

/// An immutable record of one ledger mutation.
///
/// Write-once: there is no update or delete path. Corrections are made by
/// issuing a compensating movement.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: String,
    pub store_id: String,
    pub item_id: String,

    /// None means "external source" (purchase, add-adjustment).
    pub from_location_id: Option<String>,

    /// None means "external sink" (loss, remove-adjustment).
    pub to_location_id: Option<String>,

    /// Base units moved. Always positive; direction is carried by the
    /// endpoint shape.
    pub quantity: f64,

    pub movement_type: MovementType,

    /// Mandatory free-text reason, shown in the audit trail.
    pub reason: String,

    /// Free-form operator notes.
    pub notes: Option<String>,

    /// Acting user (from the explicit actor context, never ambient).
    pub user_id: String,

    // Purchase-only fields.
    pub supplier_id: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub invoice_ref: Option<String>,

    /// Order that triggered the movement, if any.
    pub order_id: Option<String>,

    /// Client-supplied key for safe retries of double-submitted movements.
    pub idempotency_key: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Audit Log
// =============================================================================

/// Action taxonomy for the inventory audit trail.
///
/// The four movement types fan out into finer-grained actions using the
/// operator's reason (e.g. a loss with an "expired" reason is recorded as
/// `LossExpired`), so reports can split shrinkage from marketing giveaways
/// without parsing free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Purchase,
    /// Re-stock of returned/surplus goods (no supplier invoice).
    Restock,
    /// Re-entry of stock previously written off.
    Reentry,
    Loss,
    LossExpired,
    LossDamaged,
    LossTheft,
    /// Given away for marketing/courtesy.
    Gift,
    /// Consumed by staff.
    InternalUse,
    Adjustment,
    Transfer,
    /// Price/cost edit on the item (audited outside the stock ledger).
    PriceChange,
}

impl AuditAction {
    /// Classifies a movement into an audit action using its reason text.
    ///
    /// Mirrors the operator workflows: waste dialogs offer canned reasons
    /// ("Expired", "Damaged", ...) which land here as keywords. Unrecognized
    /// reasons keep the coarse action for their movement type.
    pub fn classify(movement_type: MovementType, reason: &str) -> AuditAction {
        let reason = reason.to_lowercase();
        match movement_type {
            MovementType::Purchase => {
                if reason.contains("return") || reason.contains("surplus") {
                    AuditAction::Reentry
                } else if reason.contains("restock") {
                    AuditAction::Restock
                } else {
                    AuditAction::Purchase
                }
            }
            MovementType::Loss => {
                if reason.contains("expir") {
                    AuditAction::LossExpired
                } else if reason.contains("damage") || reason.contains("breakage") {
                    AuditAction::LossDamaged
                } else if reason.contains("theft") || reason.contains("missing") {
                    AuditAction::LossTheft
                } else if reason.contains("gift") || reason.contains("courtesy") {
                    AuditAction::Gift
                } else if reason.contains("staff") || reason.contains("internal") {
                    AuditAction::InternalUse
                } else {
                    AuditAction::Loss
                }
            }
            MovementType::Adjustment => AuditAction::Adjustment,
            MovementType::Transfer => AuditAction::Transfer,
        }
    }
}

/// One append-only audit trail entry.
///
/// Never mutated or deleted once written; corrections happen via
/// compensating entries.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct AuditEntry {
    pub id: String,
    pub store_id: String,
    pub item_id: String,
    pub action_type: AuditAction,

    /// Signed delta in base units: positive for increases, negative for
    /// decreases. A transfer nets to zero and records zero here; its
    /// locations carry the direction.
    pub quantity_delta: f64,

    pub reason: String,
    pub location_from: Option<String>,
    pub location_to: Option<String>,

    // Purchase-only context.
    pub supplier_id: Option<String>,
    pub invoice_ref: Option<String>,
    pub unit_cost_cents: Option<i64>,

    pub user_id: String,
    pub order_id: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Actor Context
// =============================================================================

/// Role of the acting user, from coarsest store staff to platform operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    Manager,
    /// Platform-level operator; bypasses the same-store check.
    Platform,
}

/// Identity and tenancy of the caller, threaded explicitly through every
/// movement and audit call.
///
/// There is deliberately no ambient "current user" anywhere in the domain
/// layer; whoever invokes an operation says who they are.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ActorContext {
    pub user_id: String,
    pub store_id: String,
    pub role: Role,
}

impl ActorContext {
    /// Whether this actor may operate on the given store's inventory.
    pub fn can_operate(&self, store_id: &str) -> bool {
        self.role == Role::Platform || self.store_id == store_id
    }
}

// =============================================================================
// Menus
// =============================================================================

/// How a guest session reaches the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Table,
    Bar,
    Pickup,
    Generic,
}

/// A named catalog candidate.
///
/// Lower `priority` wins. The fallback menu (`is_fallback`) is exempt from
/// rule evaluation and serves whenever nothing else qualifies; at most one
/// should exist per store.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Menu {
    pub id: String,
    pub store_id: String,
    pub name: String,
    pub description: Option<String>,
    pub priority: i64,
    pub is_active: bool,
    pub is_fallback: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    /// Attached rules (active ones participate in resolution).
    pub rules: Vec<MenuRule>,
}

/// Kinds of menu eligibility rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RuleType {
    SessionType,
    Tables,
    TimeRange,
    Weekdays,
    ManualOverride,
}

/// Typed payload of one menu rule.
///
/// Persisted as JSON keyed by the rule's `rule_type`; parsing is strict so
/// a malformed payload surfaces as a configuration error instead of a
/// silently-ignored rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(untagged)]
pub enum RuleConfig {
    /// True iff the session type is in `values`.
    SessionType { values: Vec<SessionType> },
    /// True iff the requesting table is in `table_ids`.
    Tables { table_ids: Vec<String> },
    /// True iff time-of-day ∈ `[from, to)`; wraps midnight when from > to.
    /// Times are "HH:MM" strings.
    TimeRange { from: String, to: String },
    /// True iff the weekday is in `days` (0 = Sunday .. 6 = Saturday).
    Weekdays { days: Vec<u8> },
    /// Operator kill-switch: rule passes iff `enabled`.
    ManualOverride { enabled: bool },
}

/// One eligibility rule attached to a menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuRule {
    pub id: String,
    pub menu_id: String,
    pub rule_type: RuleType,
    pub config: RuleConfig,
    pub is_active: bool,
}

/// Join of menu ↔ product with presentation overrides.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MenuProduct {
    pub id: String,
    pub menu_id: String,
    pub product_id: String,
    /// Price override in cents; None serves the product's base price.
    pub price_override_cents: Option<i64>,
    pub sort_order: i64,
    pub is_visible: bool,
}

impl MenuProduct {
    /// The price this menu actually serves: the override if set, the
    /// product's base price otherwise.
    #[inline]
    pub fn effective_price_cents(&self, base_price_cents: i64) -> i64 {
        self.price_override_cents.unwrap_or(base_price_cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_remaining_capped() {
        let pkg = OpenPackage::new(1000.0, 500.0, None);
        assert!((pkg.percent_remaining() - 50.0).abs() < f64::EPSILON);

        // Data glitch: remaining above capacity still displays as 100%
        let pkg = OpenPackage::new(1000.0, 1200.0, None);
        assert!((pkg.percent_remaining() - 100.0).abs() < f64::EPSILON);

        let pkg = OpenPackage::new(0.0, 0.0, None);
        assert_eq!(pkg.percent_remaining(), 0.0);
    }

    #[test]
    fn test_actor_can_operate() {
        let actor = ActorContext {
            user_id: "u1".to_string(),
            store_id: "store-a".to_string(),
            role: Role::Staff,
        };
        assert!(actor.can_operate("store-a"));
        assert!(!actor.can_operate("store-b"));

        let platform = ActorContext {
            user_id: "u2".to_string(),
            store_id: "hq".to_string(),
            role: Role::Platform,
        };
        assert!(platform.can_operate("store-b"));
    }

    #[test]
    fn test_audit_action_classification() {
        assert_eq!(
            AuditAction::classify(MovementType::Loss, "Expired batch of milk"),
            AuditAction::LossExpired
        );
        assert_eq!(
            AuditAction::classify(MovementType::Loss, "Breakage behind the bar"),
            AuditAction::LossDamaged
        );
        assert_eq!(
            AuditAction::classify(MovementType::Loss, "Unexplained"),
            AuditAction::Loss
        );
        assert_eq!(
            AuditAction::classify(MovementType::Purchase, "Weekly delivery"),
            AuditAction::Purchase
        );
        assert_eq!(
            AuditAction::classify(MovementType::Transfer, "Bar refill"),
            AuditAction::Transfer
        );
    }

    #[test]
    fn test_low_stock_flag() {
        let mut item = sample_item();
        item.min_stock = 100.0;
        item.current_stock = 80.0;
        assert!(item.is_low_stock());

        item.current_stock = 150.0;
        assert!(!item.is_low_stock());

        // Threshold of zero disables the alert
        item.min_stock = 0.0;
        item.current_stock = 0.0;
        assert!(!item.is_low_stock());
    }

    fn sample_item() -> InventoryItem {
        InventoryItem {
            id: "item-1".to_string(),
            store_id: "store-a".to_string(),
            sku: "GIN-750".to_string(),
            name: "London Dry Gin 750ml".to_string(),
            unit_type: UnitType::Milliliter,
            package_size: 750.0,
            cost_cents: 2,
            sale_price_cents: Some(9),
            current_stock: 0.0,
            min_stock: 0.0,
            supplier_id: None,
            last_purchase_price_cents: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }
}
