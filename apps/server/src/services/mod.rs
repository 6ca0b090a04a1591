//! Service layer: the application-tier operations behind the HTTP routes.
//!
//! - [`stock_service`] - the movement engine and ledger reads
//! - [`menu_service`] - menu resolution and catalogs
//! - [`location_service`] - the storage location directory

pub mod location_service;
pub mod menu_service;
pub mod stock_service;

pub use location_service::LocationService;
pub use menu_service::{MenuService, ResolveMenuRequest};
pub use stock_service::{LogActionRequest, MovementOutcome, StockService};
