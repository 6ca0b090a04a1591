//! # cantina-core: Pure Business Logic for Cantina
//!
//! Every domain rule of the inventory system lives here, as deterministic
//! functions over plain data. No database, no network, no clock reads -
//! "now" is always a parameter. That is what lets the consumption
//! resolver, the movement checks and the menu engine be tested exhaustively
//! without a single mock.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cantina Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Operator Frontends (out of scope)            │   │
//! │  │    Purchase UI ──► Waste UI ──► Transfer UI ──► Menu Designer   │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ HTTP                                   │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    apps/server (axum)                           │   │
//! │  │    execute_movement, resolve_menu, location_stock, audit        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ cantina-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │  ledger   │  │ movement  │  │   menu    │  │   │
//! │  │   │ Item,Menu │  │ OpenPkgs  │  │ pre-check │  │ rule eval │  │   │
//! │  │   │ Location  │  │ Consume   │  │ endpoints │  │ fallback  │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    cantina-db (Database Layer)                  │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (InventoryItem, StorageLocation, Menu, ...)
//! - [`money`] - Integer-cents Money (currency never touches floats)
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Field-level input validation
//! - [`ledger`] - Per-location stock math and open-package consumption
//! - [`movement`] - Stock movement pre-checks (endpoint shape, extras)
//! - [`menu`] - Menu resolution engine (rules, fallback, tie-breaks)
//!
//! ## Example
//!
//! ```rust
//! use cantina_core::ledger::{plan_consumption, LocationStock};
//! use cantina_core::types::OpenPackage;
//!
//! // A bar shelf with one sealed bottle and a half-empty open one
//! let stock = LocationStock {
//!     closed_units: 1,
//!     open_packages: vec![OpenPackage::new(1000.0, 500.0, None)],
//! };
//!
//! // Pour 300 ml: the open bottle is drained first, sealed stays sealed
//! let plan = plan_consumption(&stock, 1000.0, 300.0).unwrap();
//! assert_eq!(plan.after.closed_units, 1);
//! assert_eq!(plan.after.open_packages[0].remaining, 200.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod menu;
pub mod money;
pub mod movement;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports
// =============================================================================
// The flat paths (`cantina_core::Money`) are the ones the db and server
// crates import.

pub use error::{CoreError, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a movement reason. Reasons are mandatory free text
/// shown throughout the audit trail; the bound keeps the trail readable.
pub const MAX_REASON_LEN: usize = 500;

/// Cap on simultaneously open packages per (item, location). The resolver
/// drains near-empty packages first precisely to keep this number small;
/// the cap catches runaway data (a bad import) before it degrades every
/// ledger read.
pub const MAX_OPEN_PACKAGES: usize = 50;

/// Smallest quantity difference the ledger distinguishes, in base units.
/// Stock amounts are reals (grams, milliliters); comparisons use this
/// epsilon so drain/deposit round trips never strand a phantom residue.
pub const QUANTITY_EPSILON: f64 = 1e-6;
