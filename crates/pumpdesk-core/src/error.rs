//! # Error Types
//!
//! Domain-specific error types for pumpdesk-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  pumpdesk-core errors (this file)                                      │
//! │  ├── CoreError        - Authorization, state machine, consistency      │
//! │  └── ValidationError  - Input validation failures (before any write)   │
//! │                                                                         │
//! │  pumpdesk-db errors (separate crate)                                   │
//! │  └── DbError          - Store operation failures                       │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ServiceError     - What the presentation layer sees (serialized)  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ServiceError → UI                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Authorization failures are always an error value. A caller without rights
//! never gets a silent `Ok(())`.

use thiserror::Error;

use crate::access::Role;
use crate::approval::RequestStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No verified caller identity.
    #[error("Sign-in required")]
    Unauthenticated,

    /// The caller's role may not perform this action.
    ///
    /// ## When This Occurs
    /// - A manager tries to approve a ticket
    /// - An admin tries to raise a ticket (admins review, they don't ask)
    /// - A non-admin tries to delete a record
    #[error("{role} may not {action}")]
    PermissionDenied { action: String, role: Role },

    /// A review was attempted on a request that already left `Pending`.
    ///
    /// ## User Workflow
    /// ```text
    /// Admin A approves ticket T ──► T.status = Approved
    ///                                      │
    /// Admin B (stale view) rejects T ──────┘
    ///      │
    ///      ▼
    /// AlreadyReviewed { id: T, status: Approved }
    ///      │
    ///      ▼
    /// UI shows: "Request T was already approved"
    /// ```
    #[error("Request {id} is already {status}")]
    AlreadyReviewed { id: String, status: RequestStatus },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates a PermissionDenied error.
    pub fn permission_denied(action: impl Into<String>, role: Role) -> Self {
        CoreError::PermissionDenied {
            action: action.into(),
            role,
        }
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any write; the operation does not proceed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Two related values are in the wrong order (closing < opening,
    /// end date before start date).
    #[error("{field} is out of range: {reason}")]
    InvalidRange { field: String, reason: String },

    /// Invalid format (e.g. not an email address).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::permission_denied("approve requests", Role::Manager);
        assert_eq!(err.to_string(), "manager may not approve requests");

        let err = CoreError::AlreadyReviewed {
            id: "T-1".to_string(),
            status: RequestStatus::Approved,
        };
        assert_eq!(err.to_string(), "Request T-1 is already Approved");
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("description").to_string(),
            "description is required"
        );
        assert_eq!(
            ValidationError::must_be_positive("amount").to_string(),
            "amount must be positive"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("reason").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
