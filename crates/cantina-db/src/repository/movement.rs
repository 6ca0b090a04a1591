//! # Movement Repository
//!
//! The append-only stock movement log.
//!
//! ## Write-Once
//! There is no update or delete here on purpose: a movement that turned out
//! wrong is corrected by issuing a compensating movement, never by editing
//! history. The idempotency index makes client retries safe - the second
//! submission surfaces as a unique violation which the service resolves to
//! the original record.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use cantina_core::Movement;

const MOVEMENT_COLUMNS: &str = "id, store_id, item_id, from_location_id, to_location_id, \
     quantity, movement_type, reason, notes, user_id, supplier_id, \
     unit_cost_cents, invoice_ref, order_id, idempotency_key, created_at";

/// Repository for stock movement database operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Appends a movement inside the caller's transaction.
    ///
    /// Landing in the same transaction as the ledger writes is what makes
    /// "movement recorded ⇔ ledger updated" a single unit of work.
    pub async fn append_tx(
        &self,
        conn: &mut SqliteConnection,
        movement: &Movement,
    ) -> DbResult<()> {
        debug!(
            id = %movement.id,
            item_id = %movement.item_id,
            movement_type = ?movement.movement_type,
            quantity = movement.quantity,
            "Appending movement"
        );

        sqlx::query(
            "INSERT INTO stock_movements (
                id, store_id, item_id, from_location_id, to_location_id,
                quantity, movement_type, reason, notes, user_id,
                supplier_id, unit_cost_cents, invoice_ref, order_id,
                idempotency_key, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        )
        .bind(&movement.id)
        .bind(&movement.store_id)
        .bind(&movement.item_id)
        .bind(&movement.from_location_id)
        .bind(&movement.to_location_id)
        .bind(movement.quantity)
        .bind(movement.movement_type)
        .bind(&movement.reason)
        .bind(&movement.notes)
        .bind(&movement.user_id)
        .bind(&movement.supplier_id)
        .bind(movement.unit_cost_cents)
        .bind(&movement.invoice_ref)
        .bind(&movement.order_id)
        .bind(&movement.idempotency_key)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Looks up a movement by its idempotency key.
    ///
    /// A hit means the client already submitted this operation; the service
    /// replays the original result instead of moving stock twice.
    pub async fn find_by_idempotency_key(
        &self,
        store_id: &str,
        key: &str,
    ) -> DbResult<Option<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE store_id = ?1 AND idempotency_key = ?2"
        );
        let movement = sqlx::query_as::<_, Movement>(&sql)
            .bind(store_id)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    /// Gets a movement by ID.
    pub async fn get(&self, id: &str) -> DbResult<Option<Movement>> {
        let sql = format!("SELECT {MOVEMENT_COLUMNS} FROM stock_movements WHERE id = ?1");
        let movement = sqlx::query_as::<_, Movement>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(movement)
    }

    /// Lists an item's movements, newest first.
    pub async fn list_for_item(&self, item_id: &str, limit: u32) -> DbResult<Vec<Movement>> {
        let sql = format!(
            "SELECT {MOVEMENT_COLUMNS} FROM stock_movements \
             WHERE item_id = ?1 ORDER BY created_at DESC LIMIT ?2"
        );
        let movements = sqlx::query_as::<_, Movement>(&sql)
            .bind(item_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
