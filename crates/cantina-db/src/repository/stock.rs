//! # Location Stock Repository
//!
//! The per-(item, location) ledger rows, plus the aggregate reads the
//! dashboards are built on.
//!
//! ## Row Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │ location_stock (item_id, location_id) ← PRIMARY KEY                    │
//! │                                                                         │
//! │   closed_units   INTEGER   sealed packages on the shelf                │
//! │   open_packages  TEXT      JSON: [{capacity, remaining, opened_at}]    │
//! │                                                                         │
//! │ The JSON column is decoded into Vec<OpenPackage> on read and written   │
//! │ back whole on update - the open set is small by design (the resolver   │
//! │ drains near-empty packages first).                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Transactions
//! `get_tx`/`put_tx` run on the caller's connection so a movement's
//! read-modify-write happens inside one SQLite transaction; the database
//! serializes concurrent writers, which makes the check-then-act on
//! available stock race-free.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cantina_core::ledger::LocationStock;
use cantina_core::{Money, OpenPackage, UnitType};

// =============================================================================
// Row Types
// =============================================================================

/// Raw ledger row before the JSON column is decoded.
#[derive(Debug, FromRow)]
struct LedgerRow {
    closed_units: i64,
    open_packages: String,
}

/// Raw ledger row joined with its item, for aggregate reads.
#[derive(Debug, FromRow)]
struct JoinedRow {
    item_id: String,
    location_id: String,
    closed_units: i64,
    open_packages: String,
    sku: String,
    name: String,
    unit_type: UnitType,
    package_size: f64,
    cost_cents: i64,
    current_stock: f64,
    min_stock: f64,
}

fn decode_packages(item_id: &str, raw: &str) -> DbResult<Vec<OpenPackage>> {
    serde_json::from_str(raw)
        .map_err(|e| DbError::serialization(format!("open_packages of item {item_id}"), e))
}

// =============================================================================
// Aggregate Read Types
// =============================================================================

/// Headline numbers for one location.
#[derive(Debug, Clone, Serialize)]
pub struct LocationSummary {
    pub location_id: String,
    /// Distinct items with any stock here.
    pub total_items: i64,
    pub total_closed_units: i64,
    pub total_open_packages: i64,
    /// Base units across all items (mixed units; a dashboard headline).
    pub effective_stock: f64,
    /// Σ effective stock × per-unit cost.
    pub estimated_value_cents: i64,
}

/// Per-item breakdown of one location's stock.
#[derive(Debug, Clone, Serialize)]
pub struct ItemLocationDetail {
    pub item_id: String,
    pub sku: String,
    pub name: String,
    pub unit_type: UnitType,
    pub package_size: f64,
    pub closed_units: i64,
    pub open_packages: Vec<OpenPackage>,
    pub effective_stock: f64,
    pub estimated_value_cents: i64,
    /// The item's store-wide total is at or below its threshold.
    pub low_stock: bool,
}

/// One (item, location) line of a store-wide snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct StockSnapshotRow {
    pub item_id: String,
    pub location_id: String,
    pub closed_units: i64,
    pub open_remaining: f64,
    pub effective_stock: f64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for the per-(item, location) stock ledger.
#[derive(Debug, Clone)]
pub struct StockRepository {
    pool: SqlitePool,
}

impl StockRepository {
    /// Creates a new StockRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockRepository { pool }
    }

    /// Reads one ledger row inside the caller's transaction.
    ///
    /// A missing row is an empty shelf, not an error.
    pub async fn get_tx(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        location_id: &str,
    ) -> DbResult<LocationStock> {
        let row = sqlx::query_as::<_, LedgerRow>(
            "SELECT closed_units, open_packages FROM location_stock
             WHERE item_id = ?1 AND location_id = ?2",
        )
        .bind(item_id)
        .bind(location_id)
        .fetch_optional(&mut *conn)
        .await?;

        match row {
            Some(row) => Ok(LocationStock {
                closed_units: row.closed_units,
                open_packages: decode_packages(item_id, &row.open_packages)?,
            }),
            None => Ok(LocationStock::empty()),
        }
    }

    /// Writes one ledger row inside the caller's transaction (upsert).
    pub async fn put_tx(
        &self,
        conn: &mut SqliteConnection,
        store_id: &str,
        item_id: &str,
        location_id: &str,
        stock: &LocationStock,
        now: DateTime<Utc>,
    ) -> DbResult<()> {
        debug!(
            item_id = %item_id,
            location_id = %location_id,
            closed = stock.closed_units,
            open = stock.open_packages.len(),
            "Writing ledger row"
        );

        let packages = serde_json::to_string(&stock.open_packages)
            .map_err(|e| DbError::serialization(format!("open_packages of item {item_id}"), e))?;

        sqlx::query(
            "INSERT INTO location_stock (
                item_id, location_id, store_id, closed_units, open_packages, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT (item_id, location_id) DO UPDATE SET
                closed_units = excluded.closed_units,
                open_packages = excluded.open_packages,
                updated_at = excluded.updated_at",
        )
        .bind(item_id)
        .bind(location_id)
        .bind(store_id)
        .bind(stock.closed_units)
        .bind(&packages)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Convenience pool-based read of one ledger row.
    pub async fn get(&self, item_id: &str, location_id: &str) -> DbResult<LocationStock> {
        let mut conn = self.pool.acquire().await?;
        self.get_tx(&mut conn, item_id, location_id).await
    }

    /// Aggregate metrics for one location.
    pub async fn location_summary(&self, location_id: &str) -> DbResult<LocationSummary> {
        let rows = self.joined_rows_for_location(location_id).await?;

        let mut summary = LocationSummary {
            location_id: location_id.to_string(),
            total_items: 0,
            total_closed_units: 0,
            total_open_packages: 0,
            effective_stock: 0.0,
            estimated_value_cents: 0,
        };

        let mut value = Money::zero();
        for row in rows {
            let packages = decode_packages(&row.item_id, &row.open_packages)?;
            let stock = LocationStock {
                closed_units: row.closed_units,
                open_packages: packages,
            };
            let effective = stock.effective_stock(row.package_size);
            if effective <= 0.0 {
                continue;
            }

            summary.total_items += 1;
            summary.total_closed_units += stock.closed_units;
            summary.total_open_packages += stock.open_packages.len() as i64;
            summary.effective_stock += effective;
            value += Money::from_cents(row.cost_cents).times_quantity(effective);
        }
        summary.estimated_value_cents = value.cents();

        Ok(summary)
    }

    /// Per-item breakdown for one location, including open package states.
    pub async fn location_details(&self, location_id: &str) -> DbResult<Vec<ItemLocationDetail>> {
        let rows = self.joined_rows_for_location(location_id).await?;

        let mut details = Vec::with_capacity(rows.len());
        for row in rows {
            let packages = decode_packages(&row.item_id, &row.open_packages)?;
            let stock = LocationStock {
                closed_units: row.closed_units,
                open_packages: packages,
            };
            let effective = stock.effective_stock(row.package_size);

            details.push(ItemLocationDetail {
                item_id: row.item_id,
                sku: row.sku,
                name: row.name,
                unit_type: row.unit_type,
                package_size: row.package_size,
                closed_units: stock.closed_units,
                effective_stock: effective,
                estimated_value_cents: Money::from_cents(row.cost_cents)
                    .times_quantity(effective)
                    .cents(),
                low_stock: row.min_stock > 0.0 && row.current_stock <= row.min_stock,
                open_packages: stock.open_packages,
            });
        }

        Ok(details)
    }

    /// Full per-(item, location) ledger snapshot for a store.
    pub async fn store_snapshot(&self, store_id: &str) -> DbResult<Vec<StockSnapshotRow>> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            "SELECT ls.item_id, ls.location_id, ls.closed_units, ls.open_packages,
                    i.sku, i.name, i.unit_type, i.package_size, i.cost_cents,
                    i.current_stock, i.min_stock
             FROM location_stock ls
             JOIN inventory_items i ON i.id = ls.item_id
             WHERE ls.store_id = ?1
             ORDER BY i.name, ls.location_id",
        )
        .bind(store_id)
        .fetch_all(&self.pool)
        .await?;

        let mut snapshot = Vec::with_capacity(rows.len());
        for row in rows {
            let packages = decode_packages(&row.item_id, &row.open_packages)?;
            let stock = LocationStock {
                closed_units: row.closed_units,
                open_packages: packages,
            };
            snapshot.push(StockSnapshotRow {
                effective_stock: stock.effective_stock(row.package_size),
                open_remaining: stock.open_remaining(),
                closed_units: stock.closed_units,
                item_id: row.item_id,
                location_id: row.location_id,
            });
        }

        Ok(snapshot)
    }

    async fn joined_rows_for_location(&self, location_id: &str) -> DbResult<Vec<JoinedRow>> {
        let rows = sqlx::query_as::<_, JoinedRow>(
            "SELECT ls.item_id, ls.location_id, ls.closed_units, ls.open_packages,
                    i.sku, i.name, i.unit_type, i.package_size, i.cost_cents,
                    i.current_stock, i.min_stock
             FROM location_stock ls
             JOIN inventory_items i ON i.id = ls.item_id
             WHERE ls.location_id = ?1
             ORDER BY i.name",
        )
        .bind(location_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
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
    use cantina_core::LocationType;

    async fn setup() -> (Database, String, String) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let item = sample_item("store-a", "GIN-750");
        db.items().insert(&item).await.unwrap();
        let loc = db
            .locations()
            .create("store-a", "Main Bar", LocationType::PointOfSale)
            .await
            .unwrap();
        (db, item.id, loc.id)
    }

    #[tokio::test]
    async fn test_missing_row_reads_as_empty() {
        let (db, item_id, loc_id) = setup().await;

        let stock = db.stock().get(&item_id, &loc_id).await.unwrap();
        assert_eq!(stock, LocationStock::empty());
    }

    #[tokio::test]
    async fn test_round_trip_with_open_packages() {
        let (db, item_id, loc_id) = setup().await;

        let stock = LocationStock {
            closed_units: 3,
            open_packages: vec![OpenPackage::new(750.0, 200.0, Some(Utc::now()))],
        };

        let mut tx = db.pool().begin().await.unwrap();
        db.stock()
            .put_tx(&mut tx, "store-a", &item_id, &loc_id, &stock, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = db.stock().get(&item_id, &loc_id).await.unwrap();
        assert_eq!(loaded.closed_units, 3);
        assert_eq!(loaded.open_packages.len(), 1);
        assert_eq!(loaded.open_packages[0].remaining, 200.0);

        // Upsert replaces
        let drained = LocationStock {
            closed_units: 2,
            open_packages: vec![],
        };
        let mut tx = db.pool().begin().await.unwrap();
        db.stock()
            .put_tx(&mut tx, "store-a", &item_id, &loc_id, &drained, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let loaded = db.stock().get(&item_id, &loc_id).await.unwrap();
        assert_eq!(loaded.closed_units, 2);
        assert!(loaded.open_packages.is_empty());
    }

    #[tokio::test]
    async fn test_location_summary_and_details() {
        let (db, item_id, loc_id) = setup().await;

        // 2 sealed bottles + 500 ml open, at 2 cents/ml
        let stock = LocationStock {
            closed_units: 2,
            open_packages: vec![OpenPackage::new(750.0, 500.0, None)],
        };
        let mut tx = db.pool().begin().await.unwrap();
        db.stock()
            .put_tx(&mut tx, "store-a", &item_id, &loc_id, &stock, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let summary = db.stock().location_summary(&loc_id).await.unwrap();
        assert_eq!(summary.total_items, 1);
        assert_eq!(summary.total_closed_units, 2);
        assert_eq!(summary.total_open_packages, 1);
        assert_eq!(summary.effective_stock, 2000.0);
        assert_eq!(summary.estimated_value_cents, 4000);

        let details = db.stock().location_details(&loc_id).await.unwrap();
        assert_eq!(details.len(), 1);
        assert_eq!(details[0].sku, "GIN-750");
        assert_eq!(details[0].effective_stock, 2000.0);
        assert_eq!(details[0].open_packages.len(), 1);

        let snapshot = db.stock().store_snapshot("store-a").await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].open_remaining, 500.0);
    }
}
