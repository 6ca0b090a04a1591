//! # Validation Module
//!
//! Field-level input validation, shared by the movement pre-checks and the
//! API boundary.
//!
//! Validation is layered: the API deserializer rejects malformed JSON,
//! this module enforces business bounds and formats, and the database
//! schema backs both with NOT NULL / UNIQUE / CHECK constraints. Each
//! layer catches what the one above cannot.

use crate::error::ValidationError;
use crate::MAX_REASON_LEN;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a movement/audit reason: non-empty after trimming, at most
/// [`MAX_REASON_LEN`] characters.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }
    if reason.len() > MAX_REASON_LEN {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: MAX_REASON_LEN,
        });
    }
    Ok(())
}

/// Validates a storage location name: non-empty, at most 60 characters
/// (it has to fit a picker row).
pub fn validate_location_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.len() > 60 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 60,
        });
    }
    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Upper bound on a single movement, in base units. A fat-finger guard:
/// nobody wastes a metric ton in one dialog.
const MAX_MOVEMENT_QUANTITY: f64 = 1_000_000.0;

/// Validates a stock quantity in base units: finite, positive, bounded.
pub fn validate_quantity(quantity: f64) -> ValidationResult<()> {
    if !quantity.is_finite() || quantity <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if quantity > MAX_MOVEMENT_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 0.0,
            max: MAX_MOVEMENT_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a package size in base units. Count items use 1.0; zero or
/// negative sizes would break every closed↔open conversion.
pub fn validate_package_size(size: f64) -> ValidationResult<()> {
    if !size.is_finite() || size <= 0.0 {
        return Err(ValidationError::MustBePositive {
            field: "package_size".to_string(),
        });
    }
    Ok(())
}

// =============================================================================
// Time-Of-Day Validators
// =============================================================================

/// Parses an "HH:MM" time-of-day into minutes since midnight.
///
/// Menu `time_range` rules store their bounds in this format. "24:00" is
/// rejected; end-of-day is written "23:59", or expressed with a wrapping
/// range.
///
/// ## Example
/// ```rust
/// use cantina_core::validation::parse_time_of_day;
///
/// assert_eq!(parse_time_of_day("18:30").unwrap(), 18 * 60 + 30);
/// assert!(parse_time_of_day("25:00").is_err());
/// assert!(parse_time_of_day("18h30").is_err());
/// ```
pub fn parse_time_of_day(value: &str) -> ValidationResult<u32> {
    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "time_of_day".to_string(),
        reason: reason.to_string(),
    };

    let (hours, minutes) = value
        .split_once(':')
        .ok_or_else(|| invalid("expected HH:MM"))?;

    let hours: u32 = hours.parse().map_err(|_| invalid("hours not a number"))?;
    let minutes: u32 = minutes
        .parse()
        .map_err(|_| invalid("minutes not a number"))?;

    if hours > 23 || minutes > 59 {
        return Err(invalid("out of range"));
    }

    Ok(hours * 60 + minutes)
}

/// Validates a weekday index (0 = Sunday .. 6 = Saturday).
pub fn validate_weekday(day: u8) -> ValidationResult<()> {
    if day > 6 {
        return Err(ValidationError::OutOfRange {
            field: "weekday".to_string(),
            min: 0.0,
            max: 6.0,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates that `id` parses as a UUID.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("Weekly delivery").is_ok());
        assert!(validate_reason("").is_err());
        assert!(validate_reason("   ").is_err());
        assert!(validate_reason(&"x".repeat(MAX_REASON_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_location_name() {
        assert!(validate_location_name("Main Bar").is_ok());
        assert!(validate_location_name("").is_err());
        assert!(validate_location_name(&"A".repeat(100)).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(0.5).is_ok());
        assert!(validate_quantity(48.0).is_ok());

        assert!(validate_quantity(0.0).is_err());
        assert!(validate_quantity(-1.0).is_err());
        assert!(validate_quantity(f64::NAN).is_err());
        assert!(validate_quantity(f64::INFINITY).is_err());
        assert!(validate_quantity(2_000_000.0).is_err());
    }

    #[test]
    fn test_validate_package_size() {
        assert!(validate_package_size(1.0).is_ok());
        assert!(validate_package_size(750.0).is_ok());
        assert!(validate_package_size(0.0).is_err());
        assert!(validate_package_size(-5.0).is_err());
    }

    #[test]
    fn test_parse_time_of_day() {
        assert_eq!(parse_time_of_day("00:00").unwrap(), 0);
        assert_eq!(parse_time_of_day("23:59").unwrap(), 23 * 60 + 59);
        assert_eq!(parse_time_of_day("18:00").unwrap(), 1080);

        assert!(parse_time_of_day("24:00").is_err());
        assert!(parse_time_of_day("12:60").is_err());
        assert!(parse_time_of_day("noon").is_err());
    }

    #[test]
    fn test_validate_weekday() {
        assert!(validate_weekday(0).is_ok());
        assert!(validate_weekday(6).is_ok());
        assert!(validate_weekday(7).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
