//! # Inventory Item Repository
//!
//! Database operations for the inventory catalog.
//!
//! ## The `current_stock` Column
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Total Strategy                                 │
//! │                                                                         │
//! │  ❌ WRONG: Absolute update (loses concurrent movements)                │
//! │     UPDATE inventory_items SET current_stock = 120 WHERE id = ?        │
//! │                                                                         │
//! │  ✅ CORRECT: Delta update, inside the movement's transaction           │
//! │     UPDATE inventory_items SET current_stock = current_stock + ?       │
//! │                                                                         │
//! │  The column is a denormalized sum over all location_stock rows;        │
//! │  applying signed deltas in the same transaction as the ledger write    │
//! │  keeps the invariant exact under concurrency.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cantina_core::InventoryItem;

/// Columns selected for every item read, kept in one place so reads stay
/// aligned with the `InventoryItem` struct.
const ITEM_COLUMNS: &str = "id, store_id, sku, name, unit_type, package_size, cost_cents, \
     sale_price_cents, current_stock, min_stock, supplier_id, \
     last_purchase_price_cents, is_active, created_at, updated_at";

/// Repository for inventory item database operations.
#[derive(Debug, Clone)]
pub struct ItemRepository {
    pool: SqlitePool,
}

impl ItemRepository {
    /// Creates a new ItemRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ItemRepository { pool }
    }

    /// Gets an item by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(item))` - Item found (active or deactivated)
    /// * `Ok(None)` - Item not found
    pub async fn get(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let sql = format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1");
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Gets an item by its SKU within a store.
    pub async fn get_by_sku(&self, store_id: &str, sku: &str) -> DbResult<Option<InventoryItem>> {
        let sql =
            format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE store_id = ?1 AND sku = ?2");
        let item = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(store_id)
            .bind(sku)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Lists a store's active items, sorted by name.
    pub async fn list_active(&self, store_id: &str) -> DbResult<Vec<InventoryItem>> {
        let sql = format!(
            "SELECT {ITEM_COLUMNS} FROM inventory_items \
             WHERE store_id = ?1 AND is_active = 1 ORDER BY name"
        );
        let items = sqlx::query_as::<_, InventoryItem>(&sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(items)
    }

    /// Inserts a new item.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - SKU already exists in the store
    pub async fn insert(&self, item: &InventoryItem) -> DbResult<()> {
        debug!(sku = %item.sku, "Inserting inventory item");

        sqlx::query(
            "INSERT INTO inventory_items (
                id, store_id, sku, name, unit_type, package_size,
                cost_cents, sale_price_cents, current_stock, min_stock,
                supplier_id, last_purchase_price_cents,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
        )
        .bind(&item.id)
        .bind(&item.store_id)
        .bind(&item.sku)
        .bind(&item.name)
        .bind(item.unit_type)
        .bind(item.package_size)
        .bind(item.cost_cents)
        .bind(item.sale_price_cents)
        .bind(item.current_stock)
        .bind(item.min_stock)
        .bind(&item.supplier_id)
        .bind(item.last_purchase_price_cents)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies a signed stock delta to the denormalized total, inside the
    /// caller's transaction.
    ///
    /// ## Arguments
    /// * `delta` - Base units; negative for consumption, positive for
    ///   additions, zero for transfers (which only move stock between
    ///   locations)
    pub async fn apply_stock_delta_tx(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        delta: f64,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(item_id = %item_id, delta = %delta, "Applying stock delta");

        let result = sqlx::query(
            "UPDATE inventory_items
             SET current_stock = current_stock + ?2, updated_at = ?3
             WHERE id = ?1",
        )
        .bind(item_id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", item_id));
        }

        Ok(())
    }

    /// Records the supplier and unit cost of a purchase on the item, inside
    /// the caller's transaction.
    pub async fn record_purchase_tx(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        supplier_id: &str,
        unit_cost_cents: Option<i64>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        sqlx::query(
            "UPDATE inventory_items
             SET supplier_id = ?2,
                 last_purchase_price_cents = COALESCE(?3, last_purchase_price_cents),
                 updated_at = ?4
             WHERE id = ?1",
        )
        .bind(item_id)
        .bind(supplier_id)
        .bind(unit_cost_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Updates an item's cost and sale price.
    ///
    /// Price edits bypass the movement engine; the service audits them as
    /// `price_change` entries separately.
    pub async fn update_prices(
        &self,
        item_id: &str,
        cost_cents: Option<i64>,
        sale_price_cents: Option<i64>,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE inventory_items
             SET cost_cents = COALESCE(?2, cost_cents),
                 sale_price_cents = COALESCE(?3, sale_price_cents),
                 updated_at = ?4
             WHERE id = ?1",
        )
        .bind(item_id)
        .bind(cost_cents)
        .bind(sale_price_cents)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", item_id));
        }

        Ok(())
    }

    /// Soft-deactivates an item.
    ///
    /// Items referenced by historical movements are never physically
    /// deleted; deactivation hides them from catalogs while the movement
    /// and audit history stays intact.
    pub async fn soft_delete(&self, item_id: &str) -> DbResult<()> {
        debug!(item_id = %item_id, "Deactivating inventory item");

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE inventory_items SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        )
        .bind(item_id)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("InventoryItem", item_id));
        }

        Ok(())
    }

    /// Counts a store's active items (for diagnostics).
    pub async fn count(&self, store_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM inventory_items WHERE store_id = ?1 AND is_active = 1",
        )
        .bind(store_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
