//! # API Error Type
//!
//! Unified error type for the service and HTTP layers.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Cantina                                │
//! │                                                                         │
//! │  Client                       Server                                    │
//! │  ──────                       ──────                                    │
//! │                                                                         │
//! │  POST /v1/stock/movements                                              │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Handler → StockService                                          │  │
//! │  │         │                                                        │  │
//! │  │  CoreError::InsufficientStock ──┐                                │  │
//! │  │  DbError::QueryFailed ──────────┼──► ApiError {kind, message} ──►│  │
//! │  │  Success ───────────────────────┘                                │  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  ◄── { "success": false, "error": "INSUFFICIENT_STOCK",                │
//! │        "message": "Insufficient stock for item ..." }                  │
//! │                                                                         │
//! │  Callers must read the `success` flag - a 2xx/4xx status is only a    │
//! │  transport hint, the payload is the contract.                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use cantina_core::{CoreError, ValidationError};
use cantina_db::DbError;

/// API error returned from service methods and handlers.
///
/// ## Serialization
/// ```json
/// {
///   "success": false,
///   "error": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for item gin-750: available 10, requested 15"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// Machine-readable error kind for programmatic handling
    pub kind: ErrorKind,

    /// Human-readable error message for display
    pub message: String,
}

/// Error kinds carried in API responses.
///
/// The stock/menu kinds mirror the domain taxonomy one-to-one; the last
/// three cover surfaces outside the movement engine (lookups, malformed
/// input, storage faults).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Item missing or not visible to the caller's store
    ItemNotFound,

    /// Actor may not operate on this store
    PermissionDenied,

    /// Quantity ≤ 0 or non-finite
    InvalidQuantity,

    /// Source location cannot cover the decrement
    InsufficientStock,

    /// Reason absent, purchase without supplier, ...
    MissingRequiredField,

    /// Menu/location configuration cannot satisfy the request
    ConfigurationError,

    /// Unexpected fault during the ledger/audit write sequence
    TransferFailed,

    /// Input failed validation (format, bounds)
    ValidationError,

    /// Resource not found (locations, menus, movements)
    NotFound,

    /// Storage layer failure
    DatabaseError,
}

impl ErrorKind {
    /// HTTP status the kind maps to. The response body stays the contract;
    /// the status is a transport courtesy.
    pub fn status(self) -> StatusCode {
        match self {
            ErrorKind::ItemNotFound | ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
            ErrorKind::InvalidQuantity
            | ErrorKind::MissingRequiredField
            | ErrorKind::ValidationError => StatusCode::BAD_REQUEST,
            ErrorKind::InsufficientStock | ErrorKind::ConfigurationError => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ErrorKind::TransferFailed | ErrorKind::DatabaseError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ApiError {
            kind,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorKind::NotFound, format!("{resource} not found: {id}"))
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        ApiError::new(ErrorKind::ConfigurationError, message)
    }
}

/// Converts core domain errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let kind = match &err {
            CoreError::ItemNotFound(_) => ErrorKind::ItemNotFound,
            CoreError::PermissionDenied { .. } => ErrorKind::PermissionDenied,
            CoreError::InvalidQuantity { .. } => ErrorKind::InvalidQuantity,
            CoreError::InsufficientStock { .. } => ErrorKind::InsufficientStock,
            CoreError::MissingRequiredField { .. } => ErrorKind::MissingRequiredField,
            CoreError::ConfigurationError(_) => ErrorKind::ConfigurationError,
            CoreError::MovementFailed(_) => ErrorKind::TransferFailed,
            CoreError::Validation(v) => match v {
                ValidationError::Required { .. } => ErrorKind::MissingRequiredField,
                _ => ErrorKind::ValidationError,
            },
        };
        ApiError::new(kind, err.to_string())
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorKind::ValidationError,
                format!("{field} '{value}' already exists"),
            ),
            DbError::InUse { entity, id } => ApiError::configuration(format!(
                "{entity} {id} is referenced by stock or movement history"
            )),
            other => {
                // Log the storage detail, return a generic message
                tracing::error!(error = %other, "Database operation failed");
                ApiError::new(ErrorKind::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.kind, self.message)
    }
}

impl std::error::Error for ApiError {}

/// Failure body: `success` is explicit so clients never infer success from
/// the absence of an error field.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorKind,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            success: false,
            error: self.kind,
            message: self.message,
        };
        (self.kind.status(), Json(body)).into_response()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_error_mapping() {
        let err: ApiError = CoreError::InsufficientStock {
            item_id: "item-1".to_string(),
            available: 10.0,
            requested: 15.0,
        }
        .into();
        assert_eq!(err.kind, ErrorKind::InsufficientStock);
        assert_eq!(err.kind.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let err: ApiError = CoreError::Validation(ValidationError::Required {
            field: "reason".to_string(),
        })
        .into();
        assert_eq!(err.kind, ErrorKind::MissingRequiredField);
    }

    #[test]
    fn test_db_error_mapping() {
        let err: ApiError = DbError::not_found("StorageLocation", "loc-1").into();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let err: ApiError = DbError::in_use("StorageLocation", "loc-1").into();
        assert_eq!(err.kind, ErrorKind::ConfigurationError);
    }

    #[test]
    fn test_kind_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorKind::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
