//! # Error Types
//!
//! Domain error taxonomy for cantina-core.
//!
//! Errors flow outward in layers: `ValidationError` (bad input) wraps into
//! `CoreError` (business rule violated), the persistence crate adds
//! `DbError`, and the server flattens all of them into the API error its
//! clients see. Every variant here is detected *before* any mutation -
//! callers can rely on "error returned ⇒ ledger untouched" for everything
//! except `MovementFailed`, which marks a fault mid-write-sequence.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations and domain failures.
///
/// Each variant corresponds to one machine-readable kind at the API
/// boundary; messages carry the ids and quantities needed to act on them.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The inventory item does not exist, is deactivated, or belongs to a
    /// store the caller cannot see.
    #[error("Inventory item not found: {0}")]
    ItemNotFound(String),

    /// The actor's store does not match the item's store and the actor
    /// holds no platform role.
    #[error("User {user_id} may not operate on store {store_id}")]
    PermissionDenied { user_id: String, store_id: String },

    /// Movement quantity is zero, negative, or not a finite number.
    #[error("Invalid quantity: {quantity} (must be > 0)")]
    InvalidQuantity { quantity: f64 },

    /// The source location cannot cover the requested decrement, counting
    /// both sealed packages and open remainders. Returned before anything
    /// is written; both ledgers stay untouched.
    #[error("Insufficient stock for item {item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        item_id: String,
        available: f64,
        requested: f64,
    },

    /// A mandatory field is absent - reason, purchase supplier, a required
    /// endpoint location.
    #[error("Missing required field: {field}")]
    MissingRequiredField { field: String },

    /// The stored configuration cannot satisfy the request: menu
    /// resolution with no eligible menu and no fallback, a malformed rule
    /// payload, a location operation breaking the one-default rule.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Unexpected fault during the ledger/audit write sequence - the
    /// catch-all that separates "we broke" from every "you asked for
    /// something invalid" variant above.
    #[error("Movement failed: {0}")]
    MovementFailed(String),

    /// Input validation failure (wrapped).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Field-level input failures, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value exceeds its length bound.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is outside its allowed range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: f64, max: f64 },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value doesn't parse (bad UUID, bad time-of-day, ...).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is outside the allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Field supplied on a movement type that forbids it (purchase extras
    /// on a waste entry, for instance).
    #[error("{field} is only allowed on {allowed_on} movements")]
    NotAllowedHere { field: String, allowed_on: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
