//! # Validation Module
//!
//! Input validation for every write path.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                       │
//! │  └── Types, enum values, missing numerics default to zero               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (business rules, before any write)                │
//! │  ├── amounts > 0, required text present                                 │
//! │  ├── closing >= opening on reading entries                              │
//! │  └── end date >= start date on leave requests                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  └── NOT NULL, CHECK and primary key constraints                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use pumpdesk_core::validation::{validate_positive, validate_required_text};
//!
//! assert!(validate_positive("amount", 2_000_00).is_ok());
//! assert!(validate_required_text("description", "   ").is_err());
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Volume;
use crate::types::PumpEntry;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Longest free-text field accepted (descriptions, reasons, notes).
pub const MAX_TEXT_LEN: usize = 500;

/// Longest name accepted (customers, staff).
pub const MAX_NAME_LEN: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required free-text field.
///
/// ## Rules
/// - Must not be blank after trimming
/// - At most [`MAX_TEXT_LEN`] characters
pub fn validate_required_text(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_TEXT_LEN,
        });
    }

    Ok(())
}

/// Validates a person or customer name.
///
/// ```rust
/// use pumpdesk_core::validation::validate_name;
///
/// assert!(validate_name("Sharma Transport").is_ok());
/// assert!(validate_name("").is_err());
/// ```
pub fn validate_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(())
}

/// Validates an email address. Deliberately loose: one `@`, something on
/// both sides, a dot in the domain.
pub fn validate_email(email: &str) -> ValidationResult<()> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::required("email"));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    };

    if !valid {
        return Err(ValidationError::InvalidFormat {
            field: "email".to_string(),
            reason: "must look like name@example.com".to_string(),
        });
    }

    Ok(())
}

/// Search text: may be empty, trimmed, bounded.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates an amount in minor units.
///
/// ## Rules
/// - Must be strictly positive (> 0)
///
/// ```rust
/// use pumpdesk_core::validation::validate_positive;
///
/// assert!(validate_positive("amount", 1).is_ok());
/// assert!(validate_positive("amount", 0).is_err());
/// assert!(validate_positive("amount", -100).is_err());
/// ```
pub fn validate_positive(field: &str, value: i64) -> ValidationResult<()> {
    if value <= 0 {
        return Err(ValidationError::must_be_positive(field));
    }

    Ok(())
}

/// Salaries and prices may be zero but not negative.
pub fn validate_non_negative(field: &str, value: i64) -> ValidationResult<()> {
    if value < 0 {
        return Err(ValidationError::InvalidRange {
            field: field.to_string(),
            reason: "must not be negative".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// Range Validators
// =============================================================================

/// Validates that `end` does not precede `start`.
pub fn validate_date_range(field: &str, start: NaiveDate, end: NaiveDate) -> ValidationResult<()> {
    if end < start {
        return Err(ValidationError::InvalidRange {
            field: field.to_string(),
            reason: format!("{} is before {}", end, start),
        });
    }

    Ok(())
}

/// Validates the pump lines of a reading form.
///
/// ## User Workflow
/// ```text
/// Manager enters closing meter for Pump 3: 1180.0 (opening 1234.5)
///      │
///      ▼
/// validate_pump_entries ← THIS FUNCTION
///      │
///      ├── any meter < 0?          → InvalidRange
///      ├── closing < opening?      → InvalidRange "Pump 3: closing ..."
///      ├── same pump listed twice? → InvalidFormat
///      │
///      └── OK → build_reading + upsert
/// ```
pub fn validate_pump_entries(entries: &[PumpEntry]) -> ValidationResult<()> {
    let mut seen = Vec::with_capacity(entries.len());

    for entry in entries {
        if entry.opening.is_negative() || entry.closing.is_negative() {
            return Err(ValidationError::InvalidRange {
                field: format!("pump {}", entry.pump_id),
                reason: "meter values must not be negative".to_string(),
            });
        }

        if entry.closing < entry.opening {
            return Err(ValidationError::InvalidRange {
                field: format!("pump {}", entry.pump_id),
                reason: format!(
                    "closing {} is below opening {}",
                    entry.closing, entry.opening
                ),
            });
        }

        if seen.contains(&entry.pump_id) {
            return Err(ValidationError::InvalidFormat {
                field: format!("pump {}", entry.pump_id),
                reason: "entered more than once".to_string(),
            });
        }
        seen.push(entry.pump_id);
    }

    Ok(())
}

/// Validates a delivered fuel volume.
pub fn validate_intake_amount(amount: Volume) -> ValidationResult<()> {
    validate_positive("amount", amount.millilitres())
}

// =============================================================================
// Unit Tests
// =============================================================================
