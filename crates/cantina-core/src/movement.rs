//! # Movement Pre-Checks
//!
//! Pure validation of a stock movement request: endpoint shape, quantity,
//! reason, and purchase-only extras. No I/O - the service layer loads the
//! item, checks tenancy, runs these checks, then consults the ledger.
//!
//! ## Endpoint Shape Per Movement Type
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  type        from        to          meaning                            │
//! │  ────────    ────────    ────────    ────────────────────────────────   │
//! │  purchase    -           location    supplier delivery arrives          │
//! │  loss        location    -           waste/breakage leaves the system   │
//! │  adjustment  -           location    "add" correction                   │
//! │  adjustment  location    -           "remove" correction                │
//! │  transfer    location    location    stock changes shelves              │
//! │                                                                         │
//! │  A movement's direction is carried entirely by this shape; quantity     │
//! │  is always positive.                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::MovementType;
use crate::validation::{validate_quantity, validate_reason};

// =============================================================================
// Movement Request
// =============================================================================

/// Operator intent for one stock movement, exactly as collected by the
/// calling workflow (purchase form, waste dialog, transfer dialog).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct MovementRequest {
    pub item_id: String,
    pub from_location_id: Option<String>,
    pub to_location_id: Option<String>,

    /// Base units to move. Always positive.
    pub quantity: f64,

    pub movement_type: MovementType,

    /// Mandatory free-text reason.
    pub reason: String,

    pub notes: Option<String>,

    // Purchase-only extras.
    pub supplier_id: Option<String>,
    pub unit_cost_cents: Option<i64>,
    pub invoice_ref: Option<String>,

    pub order_id: Option<String>,

    /// Optional client-supplied key; a retried submission with the same key
    /// returns the original movement instead of double-applying.
    pub idempotency_key: Option<String>,
}

impl MovementRequest {
    /// The location stock is drawn from, if this movement consumes.
    ///
    /// Purchases never consume; everything else with a source does.
    pub fn consumption_location(&self) -> Option<&str> {
        match self.movement_type {
            MovementType::Purchase => None,
            _ => self.from_location_id.as_deref(),
        }
    }

    /// The location stock is added to, if any.
    pub fn addition_location(&self) -> Option<&str> {
        self.to_location_id.as_deref()
    }

    /// Signed audit delta in base units.
    ///
    /// Transfers net to zero store-wide and record zero; their locations
    /// carry the direction.
    pub fn quantity_delta(&self) -> f64 {
        match (self.from_location_id.is_some(), self.to_location_id.is_some()) {
            (true, true) => 0.0,
            (false, true) => self.quantity,
            (true, false) => -self.quantity,
            (false, false) => 0.0,
        }
    }
}

// =============================================================================
// Validation
// =============================================================================

/// Validates a movement request's shape and fields.
///
/// ## Checks
/// - quantity > 0 (`InvalidQuantity`)
/// - reason present and bounded (`MissingRequiredField`)
/// - from/to endpoints match the movement type's shape
/// - purchase extras only on purchases; supplier mandatory on purchases
///
/// Ledger-state checks (available stock) are NOT here - they need the
/// current `LocationStock` and belong to the service's transaction.
pub fn validate_request(req: &MovementRequest) -> CoreResult<()> {
    if req.quantity <= 0.0 || !req.quantity.is_finite() {
        return Err(CoreError::InvalidQuantity {
            quantity: req.quantity,
        });
    }
    validate_quantity(req.quantity)?;

    if req.reason.trim().is_empty() {
        return Err(CoreError::MissingRequiredField {
            field: "reason".to_string(),
        });
    }
    validate_reason(&req.reason)?;

    validate_endpoints(req)?;
    validate_extras(req)?;

    Ok(())
}

/// Checks the from/to shape for the movement type.
fn validate_endpoints(req: &MovementRequest) -> CoreResult<()> {
    let from = req.from_location_id.as_deref();
    let to = req.to_location_id.as_deref();

    match req.movement_type {
        MovementType::Purchase => {
            if from.is_some() {
                return Err(shape_error("purchase", "must not have a source location"));
            }
            if to.is_none() {
                return Err(CoreError::MissingRequiredField {
                    field: "to_location_id".to_string(),
                });
            }
        }
        MovementType::Loss => {
            if to.is_some() {
                return Err(shape_error("loss", "must not have a destination location"));
            }
            if from.is_none() {
                return Err(CoreError::MissingRequiredField {
                    field: "from_location_id".to_string(),
                });
            }
        }
        MovementType::Adjustment => {
            // Exactly one endpoint: to = "add", from = "remove".
            match (from, to) {
                (Some(_), None) | (None, Some(_)) => {}
                _ => {
                    return Err(shape_error(
                        "adjustment",
                        "must have exactly one of source or destination",
                    ))
                }
            }
        }
        MovementType::Transfer => {
            let (Some(from), Some(to)) = (from, to) else {
                return Err(shape_error(
                    "transfer",
                    "must have both source and destination",
                ));
            };
            if from == to {
                return Err(shape_error(
                    "transfer",
                    "source and destination must differ",
                ));
            }
        }
    }

    Ok(())
}

/// Purchase-only fields: mandatory supplier on purchases, rejected elsewhere.
fn validate_extras(req: &MovementRequest) -> CoreResult<()> {
    if req.movement_type == MovementType::Purchase {
        if req.supplier_id.as_deref().map_or(true, |s| s.trim().is_empty()) {
            return Err(CoreError::MissingRequiredField {
                field: "supplier_id".to_string(),
            });
        }
        return Ok(());
    }

    for (field, present) in [
        ("supplier_id", req.supplier_id.is_some()),
        ("unit_cost_cents", req.unit_cost_cents.is_some()),
        ("invoice_ref", req.invoice_ref.is_some()),
    ] {
        if present {
            return Err(ValidationError::NotAllowedHere {
                field: field.to_string(),
                allowed_on: "purchase".to_string(),
            }
            .into());
        }
    }

    Ok(())
}

fn shape_error(movement: &str, detail: &str) -> CoreError {
    ValidationError::InvalidFormat {
        field: "locations".to_string(),
        reason: format!("{movement} {detail}"),
    }
    .into()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn base_request(movement_type: MovementType) -> MovementRequest {
        MovementRequest {
            item_id: "item-1".to_string(),
            from_location_id: None,
            to_location_id: None,
            quantity: 10.0,
            movement_type,
            reason: "test".to_string(),
            notes: None,
            supplier_id: None,
            unit_cost_cents: None,
            invoice_ref: None,
            order_id: None,
            idempotency_key: None,
        }
    }

    #[test]
    fn test_purchase_shape() {
        let mut req = base_request(MovementType::Purchase);
        req.to_location_id = Some("loc-1".to_string());
        req.supplier_id = Some("sup-1".to_string());
        assert!(validate_request(&req).is_ok());

        // Source on a purchase is malformed
        req.from_location_id = Some("loc-2".to_string());
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_purchase_requires_supplier() {
        let mut req = base_request(MovementType::Purchase);
        req.to_location_id = Some("loc-1".to_string());
        let err = validate_request(&req).unwrap_err();
        assert!(matches!(
            err,
            CoreError::MissingRequiredField { ref field } if field == "supplier_id"
        ));
    }

    #[test]
    fn test_extras_rejected_outside_purchase() {
        let mut req = base_request(MovementType::Loss);
        req.from_location_id = Some("loc-1".to_string());
        req.supplier_id = Some("sup-1".to_string());
        assert!(validate_request(&req).is_err());

        req.supplier_id = None;
        req.invoice_ref = Some("INV-7".to_string());
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_transfer_shape() {
        let mut req = base_request(MovementType::Transfer);
        req.from_location_id = Some("loc-1".to_string());
        req.to_location_id = Some("loc-2".to_string());
        assert!(validate_request(&req).is_ok());

        req.to_location_id = Some("loc-1".to_string());
        assert!(validate_request(&req).is_err());

        req.to_location_id = None;
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_adjustment_needs_exactly_one_endpoint() {
        let mut req = base_request(MovementType::Adjustment);
        assert!(validate_request(&req).is_err());

        req.to_location_id = Some("loc-1".to_string());
        assert!(validate_request(&req).is_ok());

        req.from_location_id = Some("loc-2".to_string());
        assert!(validate_request(&req).is_err());
    }

    #[test]
    fn test_quantity_and_reason() {
        let mut req = base_request(MovementType::Loss);
        req.from_location_id = Some("loc-1".to_string());

        req.quantity = 0.0;
        assert!(matches!(
            validate_request(&req).unwrap_err(),
            CoreError::InvalidQuantity { .. }
        ));

        req.quantity = -3.0;
        assert!(validate_request(&req).is_err());

        req.quantity = 5.0;
        req.reason = "   ".to_string();
        assert!(matches!(
            validate_request(&req).unwrap_err(),
            CoreError::MissingRequiredField { .. }
        ));
    }

    #[test]
    fn test_quantity_delta_signs() {
        let mut req = base_request(MovementType::Purchase);
        req.to_location_id = Some("loc-1".to_string());
        assert_eq!(req.quantity_delta(), 10.0);

        let mut req = base_request(MovementType::Loss);
        req.from_location_id = Some("loc-1".to_string());
        assert_eq!(req.quantity_delta(), -10.0);

        let mut req = base_request(MovementType::Transfer);
        req.from_location_id = Some("loc-1".to_string());
        req.to_location_id = Some("loc-2".to_string());
        assert_eq!(req.quantity_delta(), 0.0);
    }
}
