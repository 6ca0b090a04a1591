//! # Menu Repository
//!
//! Menus, their eligibility rules and their product joins.
//!
//! ## Rule Payloads
//! `menu_rules.rule_config` is JSON whose shape depends on `rule_type`.
//! Loading parses strictly through [`cantina_core::menu::parse_rule_config`]
//! so a malformed payload is surfaced instead of silently skipping a rule
//! the operator believes is active.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cantina_core::menu::parse_rule_config;
use cantina_core::{Menu, MenuProduct, MenuRule, RuleType};

// =============================================================================
// Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct MenuRow {
    id: String,
    store_id: String,
    name: String,
    description: Option<String>,
    priority: i64,
    is_active: bool,
    is_fallback: bool,
    created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct RuleRow {
    id: String,
    menu_id: String,
    rule_type: RuleType,
    rule_config: String,
    is_active: bool,
}

impl RuleRow {
    fn into_rule(self) -> DbResult<MenuRule> {
        let value: serde_json::Value = serde_json::from_str(&self.rule_config)
            .map_err(|e| DbError::serialization(format!("rule_config of rule {}", self.id), e))?;
        let config = parse_rule_config(self.rule_type, &value)
            .map_err(|e| DbError::serialization(format!("rule_config of rule {}", self.id), e))?;

        Ok(MenuRule {
            id: self.id,
            menu_id: self.menu_id,
            rule_type: self.rule_type,
            config,
            is_active: self.is_active,
        })
    }
}

/// One line of a menu's product list, priced and availability-checked.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MenuProductListing {
    pub product_id: String,
    pub sku: String,
    pub name: String,
    pub base_price_cents: i64,
    pub price_override_cents: Option<i64>,
    pub effective_price_cents: i64,
    pub sort_order: i64,
    /// Active item with stock on hand.
    pub available: bool,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for menu database operations.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    /// Creates a new MenuRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Inserts a menu (its rules are inserted separately).
    pub async fn insert_menu(&self, menu: &Menu) -> DbResult<()> {
        debug!(id = %menu.id, name = %menu.name, "Inserting menu");

        sqlx::query(
            "INSERT INTO menus (
                id, store_id, name, description, priority, is_active, is_fallback, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&menu.id)
        .bind(&menu.store_id)
        .bind(&menu.name)
        .bind(&menu.description)
        .bind(menu.priority)
        .bind(menu.is_active)
        .bind(menu.is_fallback)
        .bind(menu.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a rule. The typed config serializes to its JSON payload.
    pub async fn insert_rule(&self, rule: &MenuRule) -> DbResult<()> {
        let config = serde_json::to_string(&rule.config)
            .map_err(|e| DbError::serialization(format!("rule_config of rule {}", rule.id), e))?;

        sqlx::query(
            "INSERT INTO menu_rules (id, menu_id, rule_type, rule_config, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&rule.id)
        .bind(&rule.menu_id)
        .bind(rule.rule_type)
        .bind(&config)
        .bind(rule.is_active)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Inserts a menu ↔ product join.
    pub async fn insert_menu_product(&self, mp: &MenuProduct) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO menu_products (
                id, menu_id, product_id, price_override_cents, sort_order, is_visible
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&mp.id)
        .bind(&mp.menu_id)
        .bind(&mp.product_id)
        .bind(mp.price_override_cents)
        .bind(mp.sort_order)
        .bind(mp.is_visible)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Flips a rule's active flag (operator toggles, e.g. manual override).
    pub async fn set_rule_active(&self, rule_id: &str, is_active: bool) -> DbResult<()> {
        let result = sqlx::query("UPDATE menu_rules SET is_active = ?2 WHERE id = ?1")
            .bind(rule_id)
            .bind(is_active)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuRule", rule_id));
        }

        Ok(())
    }

    /// Loads a store's active menus with their rules, priority ascending.
    ///
    /// This is the resolution engine's input; it is re-read per resolution
    /// so operator toggles take effect on the next session start.
    pub async fn active_menus_with_rules(&self, store_id: &str) -> DbResult<Vec<Menu>> {
        let rows = sqlx::query_as::<_, MenuRow>(
            "SELECT id, store_id, name, description, priority, is_active, is_fallback, created_at
             FROM menus
             WHERE store_id = ?1 AND is_active = 1
             ORDER BY priority ASC, created_at ASC",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut menus = Vec::with_capacity(rows.len());
        for row in rows {
            let rule_rows = sqlx::query_as::<_, RuleRow>(
                "SELECT id, menu_id, rule_type, rule_config, is_active
                 FROM menu_rules WHERE menu_id = ?1",
            )
            .bind(&row.id)
            .fetch_all(&self.pool)
            .await?;

            let rules = rule_rows
                .into_iter()
                .map(RuleRow::into_rule)
                .collect::<DbResult<Vec<_>>>()?;

            menus.push(Menu {
                id: row.id,
                store_id: row.store_id,
                name: row.name,
                description: row.description,
                priority: row.priority,
                is_active: row.is_active,
                is_fallback: row.is_fallback,
                created_at: row.created_at,
                rules,
            });
        }

        Ok(menus)
    }

    /// A menu's visible products in sort order, with effective prices and
    /// availability.
    pub async fn menu_products(&self, menu_id: &str) -> DbResult<Vec<MenuProductListing>> {
        let listings = sqlx::query_as::<_, MenuProductListing>(
            "SELECT mp.product_id,
                    i.sku,
                    i.name,
                    COALESCE(i.sale_price_cents, 0) AS base_price_cents,
                    mp.price_override_cents,
                    COALESCE(mp.price_override_cents, i.sale_price_cents, 0)
                        AS effective_price_cents,
                    mp.sort_order,
                    (i.is_active AND i.current_stock > 0) AS available
             FROM menu_products mp
             JOIN inventory_items i ON i.id = mp.product_id
             WHERE mp.menu_id = ?1 AND mp.is_visible = 1
             ORDER BY mp.sort_order ASC, i.name ASC",
        )
        .bind(menu_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(listings)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::item::tests::sample_item;
    use crate::repository::new_id;
    use cantina_core::{RuleConfig, SessionType};

    fn menu(store_id: &str, name: &str, priority: i64, is_fallback: bool) -> Menu {
        Menu {
            id: new_id(),
            store_id: store_id.to_string(),
            name: name.to_string(),
            description: None,
            priority,
            is_active: true,
            is_fallback,
            created_at: Utc::now(),
            rules: vec![],
        }
    }

    #[tokio::test]
    async fn test_menu_and_rules_round_trip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let weekend = menu("store-a", "Weekend", 10, false);
        db.menus().insert_menu(&weekend).await.unwrap();

        let rule = MenuRule {
            id: new_id(),
            menu_id: weekend.id.clone(),
            rule_type: RuleType::Weekdays,
            config: RuleConfig::Weekdays { days: vec![5, 6] },
            is_active: true,
        };
        db.menus().insert_rule(&rule).await.unwrap();

        let session_rule = MenuRule {
            id: new_id(),
            menu_id: weekend.id.clone(),
            rule_type: RuleType::SessionType,
            config: RuleConfig::SessionType {
                values: vec![SessionType::Table, SessionType::Bar],
            },
            is_active: true,
        };
        db.menus().insert_rule(&session_rule).await.unwrap();

        let menus = db.menus().active_menus_with_rules("store-a").await.unwrap();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].rules.len(), 2);
        assert!(menus[0]
            .rules
            .iter()
            .any(|r| r.config == RuleConfig::Weekdays { days: vec![5, 6] }));
    }

    #[tokio::test]
    async fn test_inactive_menus_not_loaded() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut hidden = menu("store-a", "Hidden", 10, false);
        hidden.is_active = false;
        db.menus().insert_menu(&hidden).await.unwrap();
        db.menus()
            .insert_menu(&menu("store-a", "Fallback", 100, true))
            .await
            .unwrap();

        let menus = db.menus().active_menus_with_rules("store-a").await.unwrap();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].name, "Fallback");
    }

    #[tokio::test]
    async fn test_menu_products_pricing_and_availability() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut stocked = sample_item("store-a", "GIN-750");
        stocked.sale_price_cents = Some(900);
        stocked.current_stock = 1500.0;
        db.items().insert(&stocked).await.unwrap();

        let dry = sample_item("store-a", "RUM-700");
        db.items().insert(&dry).await.unwrap();

        let dinner = menu("store-a", "Dinner", 10, false);
        db.menus().insert_menu(&dinner).await.unwrap();

        db.menus()
            .insert_menu_product(&MenuProduct {
                id: new_id(),
                menu_id: dinner.id.clone(),
                product_id: stocked.id.clone(),
                price_override_cents: Some(750),
                sort_order: 1,
                is_visible: true,
            })
            .await
            .unwrap();
        db.menus()
            .insert_menu_product(&MenuProduct {
                id: new_id(),
                menu_id: dinner.id.clone(),
                product_id: dry.id.clone(),
                price_override_cents: None,
                sort_order: 0,
                is_visible: true,
            })
            .await
            .unwrap();

        let listings = db.menus().menu_products(&dinner.id).await.unwrap();
        assert_eq!(listings.len(), 2);

        // Sorted by sort_order: the rum first
        assert_eq!(listings[0].sku, "RUM-700");
        assert_eq!(listings[0].effective_price_cents, 9); // base price, no override
        assert!(!listings[0].available); // zero stock

        assert_eq!(listings[1].sku, "GIN-750");
        assert_eq!(listings[1].effective_price_cents, 750); // override wins
        assert!(listings[1].available);
    }
}
