//! # Menu Service
//!
//! Resolves the active menu for a session and serves menu product lists.
//!
//! ## Freshness
//! Candidates are re-read from the database on every resolution, so an
//! operator toggling `manual_override` or `is_active` takes effect on the
//! next session start (an in-flight session keeps the menu it started
//! with - the caller pins the resolved id).

use chrono::NaiveDateTime;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::ApiError;
use cantina_core::menu::{resolve, OverrideStrategy, Resolution, ResolutionContext};
use cantina_core::SessionType;
use cantina_db::repository::menu::MenuProductListing;
use cantina_db::Database;

/// Inputs of one resolution call, as collected at session start.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveMenuRequest {
    pub session_type: Option<SessionType>,
    pub table_id: Option<String>,
    pub bar_id: Option<String>,

    /// Venue-local time to resolve at; defaults to the server clock.
    /// Explicit in tests and for "preview this menu on Friday night".
    pub at: Option<NaiveDateTime>,
}

/// Application-tier service for menu resolution and catalogs.
#[derive(Debug, Clone)]
pub struct MenuService {
    db: Database,
    strategy: OverrideStrategy,
}

impl MenuService {
    /// Creates a new MenuService with the configured override strategy.
    pub fn new(db: Database, strategy: OverrideStrategy) -> Self {
        MenuService { db, strategy }
    }

    /// Picks exactly one menu for the context.
    ///
    /// Stateless per call: same candidates + same context ⇒ same menu.
    pub async fn resolve_menu(
        &self,
        store_id: &str,
        request: &ResolveMenuRequest,
    ) -> Result<Resolution, ApiError> {
        let context = ResolutionContext {
            session_type: request.session_type.unwrap_or(SessionType::Generic),
            table_id: request.table_id.clone(),
            bar_id: request.bar_id.clone(),
            local_time: request
                .at
                .unwrap_or_else(|| chrono::Local::now().naive_local()),
        };

        debug!(
            store_id = %store_id,
            session_type = ?context.session_type,
            table_id = ?context.table_id,
            "resolve_menu"
        );

        let menus = self.db.menus().active_menus_with_rules(store_id).await?;
        let resolution = resolve(&menus, &context, self.strategy)?;

        info!(
            store_id = %store_id,
            menu_id = %resolution.menu_id,
            used_fallback = resolution.used_fallback,
            warnings = resolution.warnings.len(),
            "Menu resolved"
        );

        Ok(resolution)
    }

    /// A menu's visible products in sort order, priced and
    /// availability-checked.
    pub async fn menu_products(&self, menu_id: &str) -> Result<Vec<MenuProductListing>, ApiError> {
        Ok(self.db.menus().menu_products(menu_id).await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
