//! # Repository Implementations
//!
//! One repository per aggregate:
//!
//! - [`item`] - Inventory item catalog
//! - [`location`] - Storage location directory
//! - [`stock`] - Per-(item, location) ledger rows and aggregates
//! - [`movement`] - Append-only movement log
//! - [`audit`] - Append-only audit trail with filtered queries
//! - [`menu`] - Menus, rules and product joins
//!
//! ## Design
//! Repositories own SQL; business rules stay in cantina-core. Methods that
//! must participate in the movement engine's unit of work take a
//! `&mut SqliteConnection` (suffix `_tx`); standalone methods use the pool.

pub mod audit;
pub mod item;
pub mod location;
pub mod menu;
pub mod movement;
pub mod stock;

use uuid::Uuid;

/// Generates a new entity ID.
///
/// ## Usage
/// ```rust,ignore
/// let id = new_id();
/// let location = StorageLocation { id, ... };
/// ```
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
