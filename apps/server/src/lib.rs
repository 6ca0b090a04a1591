//! # Cantina Server Library
//!
//! The application tier behind the HTTP binary: services, routes, config
//! and error types. Exposed as a library so the router can be exercised
//! in tests without binding a socket.

pub mod config;
pub mod error;
pub mod routes;
pub mod services;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorKind};

use cantina_db::Database;
use services::{LocationService, MenuService, StockService};

/// Shared application state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Database,
    pub stock: StockService,
    pub menus: MenuService,
    pub locations: LocationService,
}

impl AppState {
    /// Wires the services over one database handle.
    pub fn new(db: Database, config: &ServerConfig) -> Self {
        AppState {
            stock: StockService::new(db.clone()),
            menus: MenuService::new(db.clone(), config.override_strategy),
            locations: LocationService::new(db.clone()),
            db,
        }
    }
}
