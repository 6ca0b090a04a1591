//! # Location Service
//!
//! The storage location directory: creation (first one becomes the store
//! default), default-first listing, and guarded deletion.

use tracing::info;

use crate::error::ApiError;
use cantina_core::validation::validate_location_name;
use cantina_core::{ActorContext, CoreError, LocationType, StorageLocation};
use cantina_db::Database;

/// Application-tier service for the location directory.
#[derive(Debug, Clone)]
pub struct LocationService {
    db: Database,
}

impl LocationService {
    /// Creates a new LocationService.
    pub fn new(db: Database) -> Self {
        LocationService { db }
    }

    /// Creates a location in the actor's store.
    pub async fn create(
        &self,
        actor: &ActorContext,
        store_id: &str,
        name: &str,
        location_type: LocationType,
    ) -> Result<StorageLocation, ApiError> {
        if !actor.can_operate(store_id) {
            return Err(CoreError::PermissionDenied {
                user_id: actor.user_id.clone(),
                store_id: store_id.to_string(),
            }
            .into());
        }

        validate_location_name(name).map_err(CoreError::from)?;

        let location = self
            .db
            .locations()
            .create(store_id, name.trim(), location_type)
            .await?;

        info!(
            location_id = %location.id,
            name = %location.name,
            is_default = location.is_default,
            "Location created"
        );

        Ok(location)
    }

    /// Lists a store's locations, default first, then by creation time.
    pub async fn list(&self, store_id: &str) -> Result<Vec<StorageLocation>, ApiError> {
        Ok(self.db.locations().list(store_id).await?)
    }

    /// Deletes a location.
    ///
    /// Refuses for the store default, for locations flagged non-deletable,
    /// and for locations still referenced by stock or movement history
    /// (the repository enforces the referential part).
    pub async fn delete(&self, actor: &ActorContext, location_id: &str) -> Result<(), ApiError> {
        let location = self
            .db
            .locations()
            .get(location_id)
            .await?
            .ok_or_else(|| ApiError::not_found("StorageLocation", location_id))?;

        if !actor.can_operate(&location.store_id) {
            return Err(CoreError::PermissionDenied {
                user_id: actor.user_id.clone(),
                store_id: location.store_id.clone(),
            }
            .into());
        }

        if location.is_default || !location.is_deletable {
            return Err(ApiError::configuration(format!(
                "location {} is the store default and cannot be deleted",
                location.name
            )));
        }

        self.db.locations().delete(location_id).await?;

        info!(location_id = %location_id, "Location deleted");
        Ok(())
    }
}
