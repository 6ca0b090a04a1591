//! # Storage Location Repository
//!
//! Database operations for the location directory.
//!
//! ## Directory Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  • The first location created for a store is flagged default           │
//! │  • Listing returns default first, then creation order                  │
//! │  • A location with ledger rows holding stock, or with movement         │
//! │    history, is never deletable - the movement log must keep            │
//! │    resolving its endpoints                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::new_id;
use cantina_core::{LocationType, StorageLocation};

const LOCATION_COLUMNS: &str =
    "id, store_id, name, location_type, is_default, is_deletable, created_at";

/// Repository for storage location database operations.
#[derive(Debug, Clone)]
pub struct LocationRepository {
    pool: SqlitePool,
}

impl LocationRepository {
    /// Creates a new LocationRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LocationRepository { pool }
    }

    /// Creates a location.
    ///
    /// The first location of a store becomes the default automatically and
    /// is marked non-deletable; later ones start deletable.
    pub async fn create(
        &self,
        store_id: &str,
        name: &str,
        location_type: LocationType,
    ) -> DbResult<StorageLocation> {
        // Count + insert in one transaction so two concurrent first-creates
        // cannot both claim the default flag.
        let mut tx = self.pool.begin().await?;

        let existing: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM storage_locations WHERE store_id = ?1")
                .bind(store_id)
                .fetch_one(&mut *tx)
                .await?;

        let location = StorageLocation {
            id: new_id(),
            store_id: store_id.to_string(),
            name: name.to_string(),
            location_type,
            is_default: existing == 0,
            is_deletable: existing != 0,
            created_at: Utc::now(),
        };

        debug!(name = %location.name, is_default = location.is_default, "Creating location");

        sqlx::query(
            "INSERT INTO storage_locations (
                id, store_id, name, location_type, is_default, is_deletable, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&location.id)
        .bind(&location.store_id)
        .bind(&location.name)
        .bind(location.location_type)
        .bind(location.is_default)
        .bind(location.is_deletable)
        .bind(location.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(location)
    }

    /// Gets a location by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<StorageLocation>> {
        let sql = format!("SELECT {LOCATION_COLUMNS} FROM storage_locations WHERE id = ?1");
        let location = sqlx::query_as::<_, StorageLocation>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(location)
    }

    /// Lists a store's locations, default first, then by creation time.
    pub async fn list(&self, store_id: &str) -> DbResult<Vec<StorageLocation>> {
        let sql = format!(
            "SELECT {LOCATION_COLUMNS} FROM storage_locations \
             WHERE store_id = ?1 ORDER BY is_default DESC, created_at ASC"
        );
        let locations = sqlx::query_as::<_, StorageLocation>(&sql)
            .bind(store_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(locations)
    }

    /// Deletes a location, guarding the movement engine's referential needs.
    ///
    /// ## Refuses when
    /// - any `location_stock` row still holds stock here
    /// - any movement references the location as source or destination
    ///
    /// Empty ledger rows left behind by full drains do not block deletion;
    /// they are removed with the location.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let holds_stock: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM location_stock
             WHERE location_id = ?1 AND (closed_units > 0 OR open_packages != '[]')",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if holds_stock > 0 {
            return Err(DbError::in_use("StorageLocation", id));
        }

        let in_history: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM stock_movements
             WHERE from_location_id = ?1 OR to_location_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if in_history > 0 {
            return Err(DbError::in_use("StorageLocation", id));
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM location_stock WHERE location_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM storage_locations WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("StorageLocation", id));
        }

        tx.commit().await?;

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_first_location_is_default() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let warehouse = db
            .locations()
            .create("store-a", "Warehouse", LocationType::Warehouse)
            .await
            .unwrap();
        let bar = db
            .locations()
            .create("store-a", "Main Bar", LocationType::PointOfSale)
            .await
            .unwrap();

        assert!(warehouse.is_default);
        assert!(!warehouse.is_deletable);
        assert!(!bar.is_default);
        assert!(bar.is_deletable);

        // A different store gets its own default
        let other = db
            .locations()
            .create("store-b", "Kitchen", LocationType::Kitchen)
            .await
            .unwrap();
        assert!(other.is_default);
    }

    #[tokio::test]
    async fn test_list_orders_default_first() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.locations()
            .create("store-a", "Warehouse", LocationType::Warehouse)
            .await
            .unwrap();
        db.locations()
            .create("store-a", "Main Bar", LocationType::PointOfSale)
            .await
            .unwrap();
        db.locations()
            .create("store-a", "Kitchen", LocationType::Kitchen)
            .await
            .unwrap();

        let listed = db.locations().list("store-a").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["Warehouse", "Main Bar", "Kitchen"]);
        assert!(listed[0].is_default);
    }

    #[tokio::test]
    async fn test_delete_guards() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        db.locations()
            .create("store-a", "Warehouse", LocationType::Warehouse)
            .await
            .unwrap();
        let bar = db
            .locations()
            .create("store-a", "Main Bar", LocationType::PointOfSale)
            .await
            .unwrap();

        // Empty location deletes fine
        db.locations().delete(&bar.id).await.unwrap();
        assert!(db.locations().get(&bar.id).await.unwrap().is_none());

        // Unknown id reports not found
        assert!(matches!(
            db.locations().delete("nope").await,
            Err(DbError::NotFound { .. })
        ));
    }
}
