//! # cantina-db: Database Layer for Cantina
//!
//! SQLite persistence for the inventory system: connection pool,
//! embedded migrations, and one repository per aggregate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Service call (execute_movement, resolve_menu)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cantina-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   Database (pool.rs)      Repositories          Migrations     │   │
//! │  │   SqlitePool, WAL,        item / location /     001_inv.sql    │   │
//! │  │   busy_timeout            stock / movement /    002_menu.sql   │   │
//! │  │                           audit / menu          (embedded)     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │                       SQLite database file                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//!
//! Repositories expose two flavors of write method:
//! - pool-based, for standalone writes (audit append, location create)
//! - `&mut SqliteConnection`-based (suffix `_tx`), for calls that must land
//!   inside the movement engine's single unit of work
//!
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("cantina.db")).await?;
//!
//! let mut tx = db.pool().begin().await?;
//! let shelf = db.stock().get_tx(&mut tx, item_id, location_id).await?;
//! // ... plan via cantina-core, write back, append the movement ...
//! tx.commit().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::audit::{AuditFilter, AuditRepository};
pub use repository::item::ItemRepository;
pub use repository::location::LocationRepository;
pub use repository::menu::MenuRepository;
pub use repository::movement::MovementRepository;
pub use repository::stock::StockRepository;
