//! # Stock Service
//!
//! The movement engine: validates operator intent against the current
//! ledger, applies the mutation as one unit of work, and appends the audit
//! trail entry afterwards.
//!
//! ## One Movement, One Transaction
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute_movement(actor, request)                                       │
//! │                                                                         │
//! │  1. item lookup + tenancy            → ITEM_NOT_FOUND / PERMISSION     │
//! │  2. endpoint/quantity/reason checks  → INVALID_QUANTITY / MISSING...   │
//! │  3. idempotency-key replay check     → return original outcome         │
//! │  ┌─ BEGIN ───────────────────────────────────────────────────────────┐ │
//! │  │ 4. read source row, plan consumption → INSUFFICIENT_STOCK rolls   │ │
//! │  │    back with zero partial effect                                  │ │
//! │  │ 5. write source/destination rows                                  │ │
//! │  │ 6. apply signed delta to the item total                           │ │
//! │  │ 7. append the movement record                                     │ │
//! │  └─ COMMIT ──────────────────────────────────────────────────────────┘ │
//! │  8. append audit entry - BEST EFFORT: a failure here logs a warning     │
//! │     and reports audit_entry_id = null; the committed ledger change      │
//! │     stands. Ledger consistency is the hard invariant, audit             │
//! │     completeness is not. Keep the two writes separate.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! SQLite serializes writers, so step 4's check-then-act cannot race a
//! concurrent withdrawal past the available-stock check: the second
//! transaction sees the first one's committed state.

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{ApiError, ErrorKind};
use cantina_core::ledger::{deposit, plan_consumption};
use cantina_core::movement::{validate_request, MovementRequest};
use cantina_core::{
    ActorContext, AuditAction, AuditEntry, CoreError, InventoryItem, Movement, MovementType,
};
use cantina_db::repository::stock::{ItemLocationDetail, LocationSummary, StockSnapshotRow};
use cantina_db::{AuditFilter, Database, DbError};

// =============================================================================
// Outcome
// =============================================================================

/// Success payload of one executed movement.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MovementOutcome {
    pub movement_id: String,

    /// The item's store-wide total after the movement, in base units.
    pub new_stock_level: f64,

    /// Audit trail entry id; `None` when the best-effort audit write
    /// failed (the stock change still stands).
    pub audit_entry_id: Option<String>,

    /// True when an idempotency key matched an earlier submission and the
    /// original movement was returned instead of applying a new one.
    pub replayed: bool,
}

/// A direct audit append for actions recorded outside the movement engine
/// (order-driven consumption hooks, external corrections).
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogActionRequest {
    pub item_id: String,
    pub action_type: AuditAction,
    /// Signed delta in base units.
    pub quantity_delta: f64,
    pub reason: String,
    pub location_from: Option<String>,
    pub location_to: Option<String>,
    pub supplier_id: Option<String>,
    pub invoice_ref: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub order_id: Option<String>,
}

// =============================================================================
// Service
// =============================================================================

/// Application-tier service owning the movement engine and ledger reads.
#[derive(Debug, Clone)]
pub struct StockService {
    db: Database,
}

impl StockService {
    /// Creates a new StockService.
    pub fn new(db: Database) -> Self {
        StockService { db }
    }

    /// Validates and executes one stock movement.
    ///
    /// See the module docs for the exact ordering and failure semantics.
    /// Validation failures return before anything is written; a structured
    /// error is returned rather than a transport fault, so callers must
    /// check the payload, never the absence of an error.
    pub async fn execute_movement(
        &self,
        actor: &ActorContext,
        request: &MovementRequest,
    ) -> Result<MovementOutcome, ApiError> {
        debug!(
            item_id = %request.item_id,
            movement_type = ?request.movement_type,
            quantity = request.quantity,
            user_id = %actor.user_id,
            "execute_movement"
        );

        // (a) item exists and is visible
        let item = self
            .db
            .items()
            .get(&request.item_id)
            .await?
            .filter(|i| i.is_active)
            .ok_or_else(|| ApiError::from(CoreError::ItemNotFound(request.item_id.clone())))?;

        // (b) actor belongs to the item's store or holds an elevated role
        if !actor.can_operate(&item.store_id) {
            return Err(CoreError::PermissionDenied {
                user_id: actor.user_id.clone(),
                store_id: item.store_id.clone(),
            }
            .into());
        }

        // (c) shape, quantity, reason, purchase extras
        validate_request(request)?;

        // Referenced locations must exist in the item's store
        for location_id in [&request.from_location_id, &request.to_location_id]
            .into_iter()
            .flatten()
        {
            let location = self
                .db
                .locations()
                .get(location_id)
                .await?
                .ok_or_else(|| ApiError::not_found("StorageLocation", location_id))?;
            if location.store_id != item.store_id {
                return Err(ApiError::configuration(format!(
                    "location {} belongs to a different store",
                    location_id
                )));
            }
        }

        // Replay a double-submitted movement instead of applying it twice
        if let Some(key) = &request.idempotency_key {
            if let Some(existing) = self
                .db
                .movements()
                .find_by_idempotency_key(&item.store_id, key)
                .await?
            {
                return self.replay(&item, existing).await;
            }
        }

        // (d) one unit of work: ledger rows + item total + movement record
        let now = Utc::now();
        let movement = Movement {
            id: Uuid::new_v4().to_string(),
            store_id: item.store_id.clone(),
            item_id: item.id.clone(),
            from_location_id: request.from_location_id.clone(),
            to_location_id: request.to_location_id.clone(),
            quantity: request.quantity,
            movement_type: request.movement_type,
            reason: request.reason.trim().to_string(),
            notes: request.notes.clone(),
            user_id: actor.user_id.clone(),
            supplier_id: request.supplier_id.clone(),
            unit_cost_cents: request.unit_cost_cents,
            invoice_ref: request.invoice_ref.clone(),
            order_id: request.order_id.clone(),
            idempotency_key: request.idempotency_key.clone(),
            created_at: now,
        };

        let apply = self.apply_movement(&item, request, &movement).await;

        if let Err(err) = apply {
            // A unique violation on the idempotency index means another
            // submission with the same key won the race; replay it.
            if let (Some(key), ErrorKind::ValidationError | ErrorKind::DatabaseError) =
                (&request.idempotency_key, err.kind)
            {
                if let Some(existing) = self
                    .db
                    .movements()
                    .find_by_idempotency_key(&item.store_id, key)
                    .await?
                {
                    return self.replay(&item, existing).await;
                }
            }
            return Err(err);
        }

        // Re-read the committed total rather than deriving it - a concurrent
        // movement may have landed between our load and commit.
        let new_stock_level = self
            .db
            .items()
            .get(&item.id)
            .await?
            .map(|i| i.current_stock)
            .unwrap_or(item.current_stock + request.quantity_delta());

        info!(
            movement_id = %movement.id,
            item_id = %item.id,
            movement_type = ?movement.movement_type,
            quantity = movement.quantity,
            new_stock_level,
            "Movement committed"
        );

        // Best-effort audit append, after the commit
        let audit_entry_id = self.append_audit(actor, &item, request, &movement).await;

        Ok(MovementOutcome {
            movement_id: movement.id,
            new_stock_level,
            audit_entry_id,
            replayed: false,
        })
    }

    /// The transactional body of a movement.
    async fn apply_movement(
        &self,
        item: &InventoryItem,
        request: &MovementRequest,
        movement: &Movement,
    ) -> Result<(), ApiError> {
        let now = movement.created_at;
        let mut tx = self.db.pool().begin().await.map_err(DbError::from)?;

        // Consumption side: the resolver decides which closed/open
        // inventory the draw comes from.
        if let Some(location_id) = request.consumption_location() {
            let stock = self
                .db
                .stock()
                .get_tx(&mut tx, &item.id, location_id)
                .await?;

            let plan = plan_consumption(&stock, item.package_size, request.quantity)
                .map_err(|shortfall| shortfall.for_item(&item.id))?;

            // Stamp packages opened by this draw
            let mut after = plan.after;
            for pkg in &mut after.open_packages {
                if pkg.opened_at.is_none() {
                    pkg.opened_at = Some(now);
                }
            }

            self.db
                .stock()
                .put_tx(&mut tx, &item.store_id, &item.id, location_id, &after, now)
                .await?;
        }

        // Addition side: sealed packages plus at most one open remainder.
        if let Some(location_id) = request.addition_location() {
            let stock = self
                .db
                .stock()
                .get_tx(&mut tx, &item.id, location_id)
                .await?;

            let deposited = deposit(&stock, item.package_size, request.quantity, Some(now));

            self.db
                .stock()
                .put_tx(
                    &mut tx,
                    &item.store_id,
                    &item.id,
                    location_id,
                    &deposited.after,
                    now,
                )
                .await?;
        }

        // Denormalized store-wide total
        self.db
            .items()
            .apply_stock_delta_tx(&mut tx, &item.id, request.quantity_delta(), now)
            .await?;

        // Purchases also refresh the supplier linkage on the item
        if request.movement_type == MovementType::Purchase {
            if let Some(supplier_id) = &request.supplier_id {
                self.db
                    .items()
                    .record_purchase_tx(
                        &mut tx,
                        &item.id,
                        supplier_id,
                        request.unit_cost_cents,
                        now,
                    )
                    .await?;
            }
        }

        self.db.movements().append_tx(&mut tx, movement).await?;

        tx.commit().await.map_err(DbError::from)?;
        Ok(())
    }

    /// Returns the original outcome for a replayed idempotency key.
    async fn replay(
        &self,
        item: &InventoryItem,
        existing: Movement,
    ) -> Result<MovementOutcome, ApiError> {
        info!(
            movement_id = %existing.id,
            item_id = %item.id,
            "Idempotency key matched, replaying original movement"
        );

        // The stored total already includes the original application.
        let current = self
            .db
            .items()
            .get(&item.id)
            .await?
            .map(|i| i.current_stock)
            .unwrap_or(item.current_stock);

        Ok(MovementOutcome {
            movement_id: existing.id,
            new_stock_level: current,
            audit_entry_id: None,
            replayed: true,
        })
    }

    /// Appends the audit entry for a committed movement.
    ///
    /// Failures are logged and reported as `None`, never propagated: the
    /// ledger change has already committed and must stand.
    async fn append_audit(
        &self,
        actor: &ActorContext,
        item: &InventoryItem,
        request: &MovementRequest,
        movement: &Movement,
    ) -> Option<String> {
        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            store_id: item.store_id.clone(),
            item_id: item.id.clone(),
            action_type: AuditAction::classify(request.movement_type, &request.reason),
            quantity_delta: request.quantity_delta(),
            reason: movement.reason.clone(),
            location_from: movement.from_location_id.clone(),
            location_to: movement.to_location_id.clone(),
            supplier_id: movement.supplier_id.clone(),
            invoice_ref: movement.invoice_ref.clone(),
            unit_cost_cents: movement.unit_cost_cents,
            user_id: actor.user_id.clone(),
            order_id: movement.order_id.clone(),
            created_at: movement.created_at,
        };

        match self.db.audit().append(&entry).await {
            Ok(()) => Some(entry.id),
            Err(err) => {
                warn!(
                    movement_id = %movement.id,
                    error = %err,
                    "Audit append failed after committed movement; ledger change stands"
                );
                None
            }
        }
    }

    /// Appends an audit entry directly, without moving stock.
    ///
    /// Unlike the post-movement append, this IS the primary write of the
    /// operation, so a failure propagates to the caller.
    pub async fn log_inventory_action(
        &self,
        actor: &ActorContext,
        request: &LogActionRequest,
    ) -> Result<String, ApiError> {
        let item = self
            .db
            .items()
            .get(&request.item_id)
            .await?
            .ok_or_else(|| ApiError::from(CoreError::ItemNotFound(request.item_id.clone())))?;

        if !actor.can_operate(&item.store_id) {
            return Err(CoreError::PermissionDenied {
                user_id: actor.user_id.clone(),
                store_id: item.store_id.clone(),
            }
            .into());
        }

        if request.reason.trim().is_empty() {
            return Err(CoreError::MissingRequiredField {
                field: "reason".to_string(),
            }
            .into());
        }

        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            store_id: item.store_id.clone(),
            item_id: item.id.clone(),
            action_type: request.action_type,
            quantity_delta: request.quantity_delta,
            reason: request.reason.trim().to_string(),
            location_from: request.location_from.clone(),
            location_to: request.location_to.clone(),
            supplier_id: request.supplier_id.clone(),
            invoice_ref: request.invoice_ref.clone(),
            unit_cost_cents: request.unit_cost_cents,
            user_id: actor.user_id.clone(),
            order_id: request.order_id.clone(),
            created_at: Utc::now(),
        };

        self.db.audit().append(&entry).await?;

        info!(
            entry_id = %entry.id,
            item_id = %entry.item_id,
            action = ?entry.action_type,
            "Audit action logged"
        );

        Ok(entry.id)
    }

    /// Edits an item's cost/sale price, audited as a `price_change`.
    ///
    /// Price edits bypass the movement engine; the audit entry is
    /// best-effort here too, since the price update is the primary write.
    pub async fn update_item_prices(
        &self,
        actor: &ActorContext,
        item_id: &str,
        cost_cents: Option<i64>,
        sale_price_cents: Option<i64>,
        reason: &str,
    ) -> Result<(), ApiError> {
        let item = self
            .db
            .items()
            .get(item_id)
            .await?
            .filter(|i| i.is_active)
            .ok_or_else(|| ApiError::from(CoreError::ItemNotFound(item_id.to_string())))?;

        if !actor.can_operate(&item.store_id) {
            return Err(CoreError::PermissionDenied {
                user_id: actor.user_id.clone(),
                store_id: item.store_id.clone(),
            }
            .into());
        }

        if reason.trim().is_empty() {
            return Err(CoreError::MissingRequiredField {
                field: "reason".to_string(),
            }
            .into());
        }

        self.db
            .items()
            .update_prices(&item.id, cost_cents, sale_price_cents, Utc::now())
            .await?;

        info!(item_id = %item.id, ?cost_cents, ?sale_price_cents, "Item prices updated");

        let entry = AuditEntry {
            id: Uuid::new_v4().to_string(),
            store_id: item.store_id.clone(),
            item_id: item.id.clone(),
            action_type: AuditAction::PriceChange,
            quantity_delta: 0.0,
            reason: reason.trim().to_string(),
            location_from: None,
            location_to: None,
            supplier_id: None,
            invoice_ref: None,
            unit_cost_cents: cost_cents,
            user_id: actor.user_id.clone(),
            order_id: None,
            created_at: Utc::now(),
        };
        if let Err(err) = self.db.audit().append(&entry).await {
            warn!(
                item_id = %item.id,
                error = %err,
                "Audit append failed after committed price update"
            );
        }

        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Aggregate metrics for one location.
    pub async fn location_stock(&self, location_id: &str) -> Result<LocationSummary, ApiError> {
        self.require_location(location_id).await?;
        Ok(self.db.stock().location_summary(location_id).await?)
    }

    /// Per-item breakdown for one location, open package states included.
    pub async fn location_stock_details(
        &self,
        location_id: &str,
    ) -> Result<Vec<ItemLocationDetail>, ApiError> {
        self.require_location(location_id).await?;
        Ok(self.db.stock().location_details(location_id).await?)
    }

    /// Full per-(item, location) ledger snapshot for a store.
    pub async fn store_stock(&self, store_id: &str) -> Result<Vec<StockSnapshotRow>, ApiError> {
        Ok(self.db.stock().store_snapshot(store_id).await?)
    }

    /// Queries the store's audit trail, newest first.
    pub async fn audit_log(
        &self,
        store_id: &str,
        filter: &AuditFilter,
    ) -> Result<Vec<cantina_core::AuditEntry>, ApiError> {
        Ok(self.db.audit().query(store_id, filter).await?)
    }

    async fn require_location(&self, location_id: &str) -> Result<(), ApiError> {
        self.db
            .locations()
            .get(location_id)
            .await?
            .ok_or_else(|| ApiError::not_found("StorageLocation", location_id))?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use cantina_core::ledger::LocationStock;
    use cantina_core::{LocationType, OpenPackage, Role, UnitType};
    use cantina_db::DbConfig;

    struct Fixture {
        db: Database,
        service: StockService,
        actor: ActorContext,
        item: InventoryItem,
        warehouse: String,
        bar: String,
    }

    /// Fresh in-memory database with one item (package size 24, count) and
    /// two locations.
    async fn fixture() -> Fixture {
        fixture_with(UnitType::Count, 24.0).await
    }

    async fn fixture_with(unit_type: UnitType, package_size: f64) -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let now = Utc::now();
        let item = InventoryItem {
            id: Uuid::new_v4().to_string(),
            store_id: "store-a".to_string(),
            sku: "TONIC-200".to_string(),
            name: "Tonic Water 200ml".to_string(),
            unit_type,
            package_size,
            cost_cents: 90,
            sale_price_cents: Some(350),
            current_stock: 0.0,
            min_stock: 0.0,
            supplier_id: None,
            last_purchase_price_cents: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        db.items().insert(&item).await.unwrap();

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

        Fixture {
            service: StockService::new(db.clone()),
            db,
            actor: ActorContext {
                user_id: "u1".to_string(),
                store_id: "store-a".to_string(),
                role: Role::Manager,
            },
            item,
            warehouse: warehouse.id,
            bar: bar.id,
        }
    }

    fn purchase_request(f: &Fixture, quantity: f64, key: Option<&str>) -> MovementRequest {
        MovementRequest {
            item_id: f.item.id.clone(),
            from_location_id: None,
            to_location_id: Some(f.warehouse.clone()),
            quantity,
            movement_type: MovementType::Purchase,
            reason: "Weekly delivery".to_string(),
            notes: None,
            supplier_id: Some("sup-1".to_string()),
            unit_cost_cents: Some(85),
            invoice_ref: Some("INV-7".to_string()),
            order_id: None,
            idempotency_key: key.map(String::from),
        }
    }

    fn loss_request(f: &Fixture, from: &str, quantity: f64) -> MovementRequest {
        MovementRequest {
            item_id: f.item.id.clone(),
            from_location_id: Some(from.to_string()),
            to_location_id: None,
            quantity,
            movement_type: MovementType::Loss,
            reason: "Breakage during service".to_string(),
            notes: None,
            supplier_id: None,
            unit_cost_cents: None,
            invoice_ref: None,
            order_id: None,
            idempotency_key: None,
        }
    }

    fn transfer_request(f: &Fixture, from: &str, to: &str, quantity: f64) -> MovementRequest {
        MovementRequest {
            item_id: f.item.id.clone(),
            from_location_id: Some(from.to_string()),
            to_location_id: Some(to.to_string()),
            quantity,
            movement_type: MovementType::Transfer,
            reason: "Bar refill".to_string(),
            notes: None,
            supplier_id: None,
            unit_cost_cents: None,
            invoice_ref: None,
            order_id: None,
            idempotency_key: None,
        }
    }

    /// Σ over locations of (closed × size + open remaining) for the item.
    async fn ledger_sum(f: &Fixture) -> f64 {
        f.db.stock()
            .store_snapshot("store-a")
            .await
            .unwrap()
            .iter()
            .filter(|r| r.item_id == f.item.id)
            .map(|r| r.effective_stock)
            .sum()
    }

    #[tokio::test]
    async fn test_purchase_scenario() {
        let f = fixture().await;

        // Two sealed 24-packs = 48 base units
        let outcome = f
            .service
            .execute_movement(&f.actor, &purchase_request(&f, 48.0, None))
            .await
            .unwrap();

        assert_eq!(outcome.new_stock_level, 48.0);
        assert!(!outcome.replayed);
        assert!(outcome.audit_entry_id.is_some());

        let stock = f.db.stock().get(&f.item.id, &f.warehouse).await.unwrap();
        assert_eq!(stock.closed_units, 2);
        assert!(stock.open_packages.is_empty());

        let movement = f
            .db
            .movements()
            .get(&outcome.movement_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.movement_type, MovementType::Purchase);
        assert!(movement.from_location_id.is_none());
        assert_eq!(movement.to_location_id.as_deref(), Some(f.warehouse.as_str()));

        // Audit delta is in base units (+48), purchase context attached
        let entries = f
            .db
            .audit()
            .query("store-a", &AuditFilter::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].quantity_delta, 48.0);
        assert_eq!(entries[0].action_type, AuditAction::Purchase);
        assert_eq!(entries[0].supplier_id.as_deref(), Some("sup-1"));

        // Purchase refreshed the supplier linkage on the item
        let item = f.db.items().get(&f.item.id).await.unwrap().unwrap();
        assert_eq!(item.supplier_id.as_deref(), Some("sup-1"));
        assert_eq!(item.last_purchase_price_cents, Some(85));

        assert_eq!(ledger_sum(&f).await, item.current_stock);
    }

    #[tokio::test]
    async fn test_transfer_insufficient_stock_has_no_partial_effect() {
        let f = fixture_with(UnitType::Count, 10.0).await;

        // One sealed 10-pack at the warehouse
        f.service
            .execute_movement(&f.actor, &purchase_request(&f, 10.0, None))
            .await
            .unwrap();

        let warehouse_before = f.db.stock().get(&f.item.id, &f.warehouse).await.unwrap();
        let bar_before = f.db.stock().get(&f.item.id, &f.bar).await.unwrap();

        let err = f
            .service
            .execute_movement(&f.actor, &transfer_request(&f, &f.warehouse, &f.bar, 15.0))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InsufficientStock);

        // Both ledgers byte-for-byte unchanged
        let warehouse_after = f.db.stock().get(&f.item.id, &f.warehouse).await.unwrap();
        let bar_after = f.db.stock().get(&f.item.id, &f.bar).await.unwrap();
        assert_eq!(warehouse_before, warehouse_after);
        assert_eq!(bar_before, bar_after);

        // No movement recorded, total untouched
        assert_eq!(
            f.db.movements().list_for_item(&f.item.id, 10).await.unwrap().len(),
            1
        );
        let item = f.db.items().get(&f.item.id).await.unwrap().unwrap();
        assert_eq!(item.current_stock, 10.0);
    }

    #[tokio::test]
    async fn test_transfer_moves_stock_and_nets_to_zero() {
        let f = fixture_with(UnitType::Milliliter, 750.0).await;

        // Two bottles in, then move 900 ml to the bar: opens one bottle
        f.service
            .execute_movement(&f.actor, &purchase_request(&f, 1500.0, None))
            .await
            .unwrap();
        let outcome = f
            .service
            .execute_movement(&f.actor, &transfer_request(&f, &f.warehouse, &f.bar, 900.0))
            .await
            .unwrap();

        // Store-wide total is unchanged by a transfer
        assert_eq!(outcome.new_stock_level, 1500.0);

        let warehouse = f.db.stock().get(&f.item.id, &f.warehouse).await.unwrap();
        let bar = f.db.stock().get(&f.item.id, &f.bar).await.unwrap();

        // Source: 2 bottles - 900 ml = one open bottle with 600 ml left
        assert_eq!(warehouse.closed_units, 0);
        assert_eq!(warehouse.open_packages.len(), 1);
        assert!((warehouse.open_packages[0].remaining - 600.0).abs() < 1e-6);
        assert!(warehouse.open_packages[0].opened_at.is_some());

        // Destination: one sealed bottle + 150 ml open remainder
        assert_eq!(bar.closed_units, 1);
        assert_eq!(bar.open_packages.len(), 1);
        assert!((bar.open_packages[0].remaining - 150.0).abs() < 1e-6);

        // Ledger-sum invariant holds
        assert_eq!(ledger_sum(&f).await, 1500.0);

        // Transfer audit entry: zero delta, both locations carried
        let entries = f
            .db
            .audit()
            .query("store-a", &AuditFilter::default())
            .await
            .unwrap();
        assert_eq!(entries[0].action_type, AuditAction::Transfer);
        assert_eq!(entries[0].quantity_delta, 0.0);
        assert_eq!(entries[0].location_from.as_deref(), Some(f.warehouse.as_str()));
        assert_eq!(entries[0].location_to.as_deref(), Some(f.bar.as_str()));
    }

    #[tokio::test]
    async fn test_waste_drains_open_packages_first() {
        let f = fixture_with(UnitType::Milliliter, 100.0).await;

        // Hand-build a shelf: 1 sealed + opens of {5, 20, 2}
        let mut tx = f.db.pool().begin().await.unwrap();
        let shelf = LocationStock {
            closed_units: 1,
            open_packages: vec![
                OpenPackage::new(100.0, 5.0, None),
                OpenPackage::new(100.0, 20.0, None),
                OpenPackage::new(100.0, 2.0, None),
            ],
        };
        f.db.stock()
            .put_tx(&mut tx, "store-a", &f.item.id, &f.bar, &shelf, Utc::now())
            .await
            .unwrap();
        f.db.items()
            .apply_stock_delta_tx(&mut tx, &f.item.id, 127.0, Utc::now())
            .await
            .unwrap();
        tx.commit().await.unwrap();

        f.service
            .execute_movement(&f.actor, &loss_request(&f, &f.bar, 4.0))
            .await
            .unwrap();

        let after = f.db.stock().get(&f.item.id, &f.bar).await.unwrap();
        // The 2-package drained away; the 5-package gave the other 2
        assert_eq!(after.closed_units, 1);
        let remainders: Vec<f64> = after.open_packages.iter().map(|p| p.remaining).collect();
        assert_eq!(remainders, vec![3.0, 20.0]);

        let item = f.db.items().get(&f.item.id).await.unwrap().unwrap();
        assert_eq!(item.current_stock, 123.0);
        assert_eq!(ledger_sum(&f).await, 123.0);
    }

    #[tokio::test]
    async fn test_validation_failures_leave_no_trace() {
        let f = fixture().await;

        // Empty reason
        let mut req = purchase_request(&f, 48.0, None);
        req.reason = "  ".to_string();
        let err = f.service.execute_movement(&f.actor, &req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredField);

        // Non-positive quantity
        let mut req = purchase_request(&f, 48.0, None);
        req.quantity = 0.0;
        let err = f.service.execute_movement(&f.actor, &req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidQuantity);

        // Purchase without supplier
        let mut req = purchase_request(&f, 48.0, None);
        req.supplier_id = None;
        let err = f.service.execute_movement(&f.actor, &req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredField);

        // Unknown item
        let mut req = purchase_request(&f, 48.0, None);
        req.item_id = "ghost".to_string();
        let err = f.service.execute_movement(&f.actor, &req).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ItemNotFound);

        // Nothing written on any of those paths
        assert!(f
            .db
            .movements()
            .list_for_item(&f.item.id, 10)
            .await
            .unwrap()
            .is_empty());
        assert!(f
            .db
            .audit()
            .query("store-a", &AuditFilter::default())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_permission_denied_for_foreign_store() {
        let f = fixture().await;

        let outsider = ActorContext {
            user_id: "u9".to_string(),
            store_id: "store-b".to_string(),
            role: Role::Manager,
        };
        let err = f
            .service
            .execute_movement(&outsider, &purchase_request(&f, 48.0, None))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::PermissionDenied);

        // Platform operators bypass the same-store check
        let platform = ActorContext {
            user_id: "ops".to_string(),
            store_id: "hq".to_string(),
            role: Role::Platform,
        };
        assert!(f
            .service
            .execute_movement(&platform, &purchase_request(&f, 48.0, None))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_idempotency_key_replays_original() {
        let f = fixture().await;

        let first = f
            .service
            .execute_movement(&f.actor, &purchase_request(&f, 48.0, Some("req-1")))
            .await
            .unwrap();
        let second = f
            .service
            .execute_movement(&f.actor, &purchase_request(&f, 48.0, Some("req-1")))
            .await
            .unwrap();

        assert!(!first.replayed);
        assert!(second.replayed);
        assert_eq!(first.movement_id, second.movement_id);

        // Applied exactly once
        let item = f.db.items().get(&f.item.id).await.unwrap().unwrap();
        assert_eq!(item.current_stock, 48.0);
        assert_eq!(second.new_stock_level, 48.0);
        assert_eq!(
            f.db.movements().list_for_item(&f.item.id, 10).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_concurrent_withdrawals_never_both_pass_the_stock_check() {
        let f = fixture_with(UnitType::Count, 1.0).await;

        // 15 single units on the bar shelf
        f.service
            .execute_movement(
                &f.actor,
                &MovementRequest {
                    to_location_id: Some(f.bar.clone()),
                    ..purchase_request(&f, 15.0, None)
                },
            )
            .await
            .unwrap();

        // Two concurrent withdrawals of 10: at most one can fit
        let req_a = loss_request(&f, &f.bar, 10.0);
        let req_b = loss_request(&f, &f.bar, 10.0);
        let (a, b) = tokio::join!(
            f.service.execute_movement(&f.actor, &req_a),
            f.service.execute_movement(&f.actor, &req_b),
        );

        let successes = [&a, &b].iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1);

        let failure = if a.is_err() { a.unwrap_err() } else { b.unwrap_err() };
        assert_eq!(failure.kind, ErrorKind::InsufficientStock);

        // The survivor left a consistent ledger
        let item = f.db.items().get(&f.item.id).await.unwrap().unwrap();
        assert_eq!(item.current_stock, 5.0);
        assert_eq!(ledger_sum(&f).await, 5.0);
    }

    #[tokio::test]
    async fn test_location_reads() {
        let f = fixture_with(UnitType::Milliliter, 750.0).await;

        f.service
            .execute_movement(&f.actor, &purchase_request(&f, 2250.0, None))
            .await
            .unwrap();
        f.service
            .execute_movement(&f.actor, &transfer_request(&f, &f.warehouse, &f.bar, 800.0))
            .await
            .unwrap();

        let summary = f.service.location_stock(&f.warehouse).await.unwrap();
        assert_eq!(summary.total_items, 1);
        assert!((summary.effective_stock - 1450.0).abs() < 1e-6);

        let details = f.service.location_stock_details(&f.bar).await.unwrap();
        assert_eq!(details.len(), 1);
        assert!((details[0].effective_stock - 800.0).abs() < 1e-6);

        let snapshot = f.service.store_stock("store-a").await.unwrap();
        assert_eq!(snapshot.len(), 2);

        let err = f.service.location_stock("ghost").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_log_inventory_action_directly() {
        let f = fixture().await;

        let request = LogActionRequest {
            item_id: f.item.id.clone(),
            action_type: AuditAction::InternalUse,
            quantity_delta: -2.0,
            reason: "Staff tasting".to_string(),
            location_from: Some(f.bar.clone()),
            location_to: None,
            supplier_id: None,
            invoice_ref: None,
            unit_cost_cents: None,
            order_id: Some("order-9".to_string()),
        };
        let entry_id = f
            .service
            .log_inventory_action(&f.actor, &request)
            .await
            .unwrap();

        let entries = f
            .db
            .audit()
            .query("store-a", &AuditFilter::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, entry_id);
        assert_eq!(entries[0].action_type, AuditAction::InternalUse);
        assert_eq!(entries[0].order_id.as_deref(), Some("order-9"));

        // Reason stays mandatory on the direct path too
        let mut bad = request.clone();
        bad.reason = " ".to_string();
        let err = f
            .service
            .log_inventory_action(&f.actor, &bad)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::MissingRequiredField);
    }

    #[tokio::test]
    async fn test_price_update_is_audited() {
        let f = fixture().await;

        f.service
            .update_item_prices(&f.actor, &f.item.id, Some(95), Some(380), "Supplier increase")
            .await
            .unwrap();

        let item = f.db.items().get(&f.item.id).await.unwrap().unwrap();
        assert_eq!(item.cost_cents, 95);
        assert_eq!(item.sale_price_cents, Some(380));

        let entries = f
            .db
            .audit()
            .query("store-a", &AuditFilter::default())
            .await
            .unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].action_type, AuditAction::PriceChange);
        assert_eq!(entries[0].quantity_delta, 0.0);

        // Stock is untouched by a price edit
        assert_eq!(item.current_stock, 0.0);
    }
}
