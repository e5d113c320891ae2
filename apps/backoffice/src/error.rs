//! # Service Error Type
//!
//! Unified error type for backoffice operations.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Pumpdesk                               │
//! │                                                                         │
//! │  service fn ── Result<T, ServiceError>                                  │
//! │       │                                                                 │
//! │       ├── CoreError::Validation        ──► VALIDATION_ERROR   (inline)  │
//! │       ├── CoreError::Unauthenticated   ──► UNAUTHENTICATED    (inline)  │
//! │       ├── CoreError::PermissionDenied  ──► PERMISSION_DENIED  (inline)  │
//! │       ├── CoreError::AlreadyReviewed   ──► CONFLICT           (inline)  │
//! │       ├── DbError::NotFound            ──► NOT_FOUND          (inline)  │
//! │       ├── DbError::Conflict / Busy     ──► CONFLICT           (inline)  │
//! │       ├── hook failed after status     ──► INCONSISTENCY      (report)  │
//! │       ├── DbError::ConnectionFailed    ──► UNAVAILABLE        (generic, │
//! │       │   / PoolExhausted                                     retryable)│
//! │       └── anything else                ──► INTERNAL           (generic) │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Serialization
//! What the presentation layer receives when an operation fails:
//! ```json
//! { "code": "PERMISSION_DENIED", "message": "manager may not review approval requests" }
//! ```
//! Transport and internal failures carry a generic message; the detail is
//! logged instead.

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;
use tracing::{error, warn};

use pumpdesk_core::{CoreError, ValidationError};
use pumpdesk_db::DbError;

/// Machine-readable error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    Unauthenticated,
    PermissionDenied,
    InvalidArgument,
    NotFound,
    Conflict,
    Inconsistency,
    Unavailable,
    Internal,
}

/// Backoffice operation errors.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Input rejected before any write.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Sign-in required")]
    Unauthenticated,

    #[error("{role} may not {action}")]
    PermissionDenied { action: String, role: String },

    /// A required argument to the provisioning boundary was missing.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Lost a race with another writer, or the record already moved on.
    #[error("{0}")]
    Conflict(String),

    /// A multi-step write could not be completed; nothing was applied.
    ///
    /// ## When This Occurs
    /// - A ticket was marked approved but its salary-advance hook failed
    ///   before commit
    #[error("Inconsistent state: {0}")]
    Inconsistency(String),

    /// The store is unreachable. Safe to retry.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ServiceError::Validation(_) => ErrorCode::ValidationError,
            ServiceError::Unauthenticated => ErrorCode::Unauthenticated,
            ServiceError::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            ServiceError::InvalidArgument(_) => ErrorCode::InvalidArgument,
            ServiceError::NotFound { .. } => ErrorCode::NotFound,
            ServiceError::Conflict(_) => ErrorCode::Conflict,
            ServiceError::Inconsistency(_) => ErrorCode::Inconsistency,
            ServiceError::Unavailable(_) => ErrorCode::Unavailable,
            ServiceError::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        ServiceError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Whether the caller may simply try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::Unavailable(_))
    }

    /// Message safe to show to the user.
    ///
    /// Validation and authorization errors are specific; transport and
    /// internal errors are generic.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Unavailable(_) => {
                "The store is unreachable right now. Please try again.".to_string()
            }
            ServiceError::Internal(_) => "Something went wrong. Please try again.".to_string(),
            ServiceError::Inconsistency(_) => {
                "The change could not be completed and was not applied. Please try again."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

impl Serialize for ServiceError {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ServiceError", 2)?;
        s.serialize_field("code", &self.code())?;
        s.serialize_field("message", &self.user_message())?;
        s.end()
    }
}

/// Converts core errors to service errors.
impl From<CoreError> for ServiceError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ServiceError::Validation(e),
            CoreError::Unauthenticated => ServiceError::Unauthenticated,
            CoreError::PermissionDenied { action, role } => ServiceError::PermissionDenied {
                action,
                role: role.to_string(),
            },
            CoreError::AlreadyReviewed { id, status } => {
                ServiceError::Conflict(format!("Request {} was already {}", id, status))
            }
            CoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
        }
    }
}

/// Converts database errors to service errors.
impl From<DbError> for ServiceError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                ServiceError::Conflict(format!("{} '{}' already exists", field, value))
            }
            DbError::Conflict { entity, id } => ServiceError::Conflict(format!(
                "{} {} was changed by someone else",
                entity, id
            )),
            DbError::Busy(detail) => {
                warn!("Write lock contention: {}", detail);
                ServiceError::Conflict(
                    "Another device is saving the same records. Please try again.".to_string(),
                )
            }
            DbError::ForeignKeyViolation { message } => {
                error!("Foreign key violation: {}", message);
                ServiceError::NotFound {
                    entity: "Referenced record".to_string(),
                    id: "unknown".to_string(),
                }
            }
            err if err.is_retryable() => {
                error!("Store unavailable: {}", err);
                ServiceError::Unavailable(err.to_string())
            }
            other => {
                error!("Store operation failed: {}", other);
                ServiceError::Internal(other.to_string())
            }
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
