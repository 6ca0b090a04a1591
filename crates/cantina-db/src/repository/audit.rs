//! # Audit Log Repository
//!
//! The append-only inventory audit trail.
//!
//! ## Best-Effort By Design
//! The trail is deliberately NOT part of the movement transaction. The
//! service appends an entry *after* the ledger commit; if the append fails
//! the stock change stands and the failure is logged as a warning. Ledger
//! consistency is the hard invariant, audit completeness is best-effort.
//! Do not "fix" this into a single transaction without revisiting that
//! decision.
//!
//! ## Querying
//! Newest-first, paginated, with optional filters:
//! item / location / user / action type / date range.

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use cantina_core::{AuditAction, AuditEntry};

/// Optional filters for audit queries. Unset fields don't constrain.
#[derive(Debug, Clone, Default)]
pub struct AuditFilter {
    pub item_id: Option<String>,
    /// Matches the location on either end of the action.
    pub location_id: Option<String>,
    pub user_id: Option<String>,
    pub action_type: Option<AuditAction>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Page size; defaults to 50, capped at 200.
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Repository for the inventory audit trail.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    pool: SqlitePool,
}

impl AuditRepository {
    /// Creates a new AuditRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AuditRepository { pool }
    }

    /// Appends one audit entry.
    ///
    /// Runs on the pool, not a caller transaction - see the module docs for
    /// why the trail never joins the movement's unit of work.
    pub async fn append(&self, entry: &AuditEntry) -> DbResult<()> {
        debug!(
            id = %entry.id,
            item_id = %entry.item_id,
            action = ?entry.action_type,
            delta = entry.quantity_delta,
            "Appending audit entry"
        );

        sqlx::query(
            "INSERT INTO inventory_audit_log (
                id, store_id, item_id, action_type, quantity_delta, reason,
                location_from, location_to, supplier_id, invoice_ref,
                unit_cost_cents, user_id, order_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&entry.id)
        .bind(&entry.store_id)
        .bind(&entry.item_id)
        .bind(entry.action_type)
        .bind(entry.quantity_delta)
        .bind(&entry.reason)
        .bind(&entry.location_from)
        .bind(&entry.location_to)
        .bind(&entry.supplier_id)
        .bind(&entry.invoice_ref)
        .bind(entry.unit_cost_cents)
        .bind(&entry.user_id)
        .bind(&entry.order_id)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Queries a store's audit trail, newest first.
    pub async fn query(&self, store_id: &str, filter: &AuditFilter) -> DbResult<Vec<AuditEntry>> {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT id, store_id, item_id, action_type, quantity_delta, reason,
                    location_from, location_to, supplier_id, invoice_ref,
                    unit_cost_cents, user_id, order_id, created_at
             FROM inventory_audit_log WHERE store_id = ",
        );
        builder.push_bind(store_id);

        if let Some(item_id) = &filter.item_id {
            builder.push(" AND item_id = ").push_bind(item_id);
        }
        if let Some(location_id) = &filter.location_id {
            builder
                .push(" AND (location_from = ")
                .push_bind(location_id)
                .push(" OR location_to = ")
                .push_bind(location_id)
                .push(")");
        }
        if let Some(user_id) = &filter.user_id {
            builder.push(" AND user_id = ").push_bind(user_id);
        }
        if let Some(action) = filter.action_type {
            builder.push(" AND action_type = ").push_bind(action);
        }
        if let Some(from) = filter.from {
            builder.push(" AND created_at >= ").push_bind(from);
        }
        if let Some(to) = filter.to {
            builder.push(" AND created_at < ").push_bind(to);
        }

        let limit = filter.limit.unwrap_or(50).min(200);
        let offset = filter.offset.unwrap_or(0);
        builder.push(" ORDER BY created_at DESC LIMIT ");
        builder.push_bind(limit);
        builder.push(" OFFSET ");
        builder.push_bind(offset);

        let entries = builder
            .build_query_as::<AuditEntry>()
            .fetch_all(&self.pool)
            .await?;

        Ok(entries)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
