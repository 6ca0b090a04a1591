//! # HTTP Routes
//!
//! Thin translation between HTTP and the typed service layer. Handlers
//! never contain business rules - they deserialize, call a service, and
//! wrap the outcome.
//!
//! ## Surface
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST   /v1/stock/movements              execute a movement             │
//! │  GET    /v1/locations/{id}/stock         location aggregates            │
//! │  GET    /v1/locations/{id}/stock/details per-item breakdown             │
//! │  GET    /v1/stores/{id}/stock            full ledger snapshot           │
//! │  GET    /v1/stores/{id}/audit            audit trail (filtered, paged)  │
//! │  POST   /v1/stores/{id}/locations        create location                │
//! │  GET    /v1/stores/{id}/locations        list locations                 │
//! │  DELETE /v1/locations/{id}               delete location (guarded)      │
//! │  POST   /v1/stores/{id}/menu/resolve     pick the active menu           │
//! │  GET    /v1/menus/{id}/products          priced product list            │
//! │  GET    /health                          liveness                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Actor Context
//! Mutating routes carry an explicit `actor` object in the request body.
//! Identity verification is the (out of scope) gateway's job; the domain
//! layer only ever sees the explicit context, never an ambient session.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::AppState;
use cantina_core::menu::Resolution;
use cantina_core::movement::MovementRequest;
use cantina_core::{ActorContext, AuditAction, AuditEntry, LocationType, StorageLocation};
use cantina_db::repository::menu::MenuProductListing;
use cantina_db::repository::stock::{ItemLocationDetail, LocationSummary, StockSnapshotRow};
use cantina_db::AuditFilter;

use crate::services::MovementOutcome;

// =============================================================================
// Envelope
// =============================================================================

/// Success envelope. The explicit flag is the contract: clients check it,
/// not the HTTP status and not the absence of an error field.
#[derive(Debug, Serialize)]
struct ApiResponse<T> {
    success: bool,
    data: T,
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse {
        success: true,
        data,
    })
}

// =============================================================================
// Router
// =============================================================================

/// Builds the HTTP router over the shared application state.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/stock/movements", post(execute_movement))
        .route("/v1/stock/actions", post(log_inventory_action))
        .route("/v1/items/:id/prices", post(update_item_prices))
        .route("/v1/locations/:id/stock", get(location_stock))
        .route("/v1/locations/:id/stock/details", get(location_stock_details))
        .route("/v1/locations/:id", delete(delete_location))
        .route("/v1/stores/:id/stock", get(store_stock))
        .route("/v1/stores/:id/audit", get(audit_log))
        .route(
            "/v1/stores/:id/locations",
            post(create_location).get(list_locations),
        )
        .route("/v1/stores/:id/menu/resolve", post(resolve_menu))
        .route("/v1/menus/:id/products", get(menu_products))
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    database: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        database: state.db.health_check().await,
    })
}

// =============================================================================
// Stock
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteMovementBody {
    actor: ActorContext,
    movement: MovementRequest,
}

async fn execute_movement(
    State(state): State<AppState>,
    Json(body): Json<ExecuteMovementBody>,
) -> Result<Json<ApiResponse<MovementOutcome>>, ApiError> {
    let outcome = state
        .stock
        .execute_movement(&body.actor, &body.movement)
        .await?;
    Ok(ok(outcome))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogActionBody {
    actor: ActorContext,
    action: crate::services::LogActionRequest,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogActionResponse {
    audit_entry_id: String,
}

async fn log_inventory_action(
    State(state): State<AppState>,
    Json(body): Json<LogActionBody>,
) -> Result<Json<ApiResponse<LogActionResponse>>, ApiError> {
    let audit_entry_id = state
        .stock
        .log_inventory_action(&body.actor, &body.action)
        .await?;
    Ok(ok(LogActionResponse { audit_entry_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdatePricesBody {
    actor: ActorContext,
    cost_cents: Option<i64>,
    sale_price_cents: Option<i64>,
    reason: String,
}

async fn update_item_prices(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    Json(body): Json<UpdatePricesBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .stock
        .update_item_prices(
            &body.actor,
            &item_id,
            body.cost_cents,
            body.sale_price_cents,
            &body.reason,
        )
        .await?;
    Ok(ok(()))
}

async fn location_stock(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
) -> Result<Json<ApiResponse<LocationSummary>>, ApiError> {
    Ok(ok(state.stock.location_stock(&location_id).await?))
}

async fn location_stock_details(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ItemLocationDetail>>>, ApiError> {
    Ok(ok(state.stock.location_stock_details(&location_id).await?))
}

async fn store_stock(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<StockSnapshotRow>>>, ApiError> {
    Ok(ok(state.stock.store_stock(&store_id).await?))
}

// =============================================================================
// Audit
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuditQuery {
    item_id: Option<String>,
    location_id: Option<String>,
    user_id: Option<String>,
    action_type: Option<AuditAction>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
    limit: Option<u32>,
    offset: Option<u32>,
}

async fn audit_log(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Query(query): Query<AuditQuery>,
) -> Result<Json<ApiResponse<Vec<AuditEntry>>>, ApiError> {
    let filter = AuditFilter {
        item_id: query.item_id,
        location_id: query.location_id,
        user_id: query.user_id,
        action_type: query.action_type,
        from: query.from,
        to: query.to,
        limit: query.limit,
        offset: query.offset,
    };
    Ok(ok(state.stock.audit_log(&store_id, &filter).await?))
}

// =============================================================================
// Locations
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateLocationBody {
    actor: ActorContext,
    name: String,
    location_type: LocationType,
}

async fn create_location(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Json(body): Json<CreateLocationBody>,
) -> Result<Json<ApiResponse<StorageLocation>>, ApiError> {
    let location = state
        .locations
        .create(&body.actor, &store_id, &body.name, body.location_type)
        .await?;
    Ok(ok(location))
}

async fn list_locations(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<StorageLocation>>>, ApiError> {
    Ok(ok(state.locations.list(&store_id).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActorBody {
    actor: ActorContext,
}

async fn delete_location(
    State(state): State<AppState>,
    Path(location_id): Path<String>,
    Json(body): Json<ActorBody>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    state.locations.delete(&body.actor, &location_id).await?;
    Ok(ok(()))
}

// =============================================================================
// Menus
// =============================================================================

async fn resolve_menu(
    State(state): State<AppState>,
    Path(store_id): Path<String>,
    Json(body): Json<crate::services::ResolveMenuRequest>,
) -> Result<Json<ApiResponse<Resolution>>, ApiError> {
    Ok(ok(state.menus.resolve_menu(&store_id, &body).await?))
}

async fn menu_products(
    State(state): State<AppState>,
    Path(menu_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<MenuProductListing>>>, ApiError> {
    Ok(ok(state.menus.menu_products(&menu_id).await?))
}
