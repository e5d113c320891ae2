//! # pumpdesk-core: Pure Business Logic for Pumpdesk
//!
//! Everything the filling-station back office *decides* lives here as pure
//! functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pumpdesk Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 backoffice (application layer)                  │   │
//! │  │   AppState • identity • services • live dashboard              │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │             ★ pumpdesk-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐ ┌─────────┐ ┌──────────┐ ┌─────────┐ ┌────────┐  │   │
//! │  │   │  types  │ │  money  │ │  ledger  │ │approval │ │ access │  │   │
//! │  │   │ Reading │ │  Money  │ │ tank,    │ │ Pending │ │  Role  │  │   │
//! │  │   │ Expense │ │ Volume  │ │ dues,    │ │ → Appr. │ │  Actor │  │   │
//! │  │   │ Staff   │ │         │ │ payable  │ │ → Rej.  │ │        │  │   │
//! │  │   └─────────┘ └─────────┘ └──────────┘ └─────────┘ └────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 pumpdesk-db (record store)                      │   │
//! │  │        SQLite repositories, change feed, snapshot cache         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Reading, FuelIntake, StaffMember, ...)
//! - [`money`] - Integer `Money` (paise) and `Volume` (millilitres)
//! - [`ledger`] - Aggregation engine: derived views from record slices
//! - [`approval`] - Generic reviewable-request state machine
//! - [`access`] - Roles and the verified caller (`Actor`)
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use pumpdesk_core::ledger::compute_customer_balance;
//! use pumpdesk_core::money::Money;
//!
//! let balance = compute_customer_balance(&[]);
//! assert_eq!(balance.due, Money::zero());
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod approval;
pub mod error;
pub mod ledger;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{Actor, Role};
pub use approval::{
    visible_to, ApprovalCategory, ApprovalTicket, Decision, FinanceKind, FinanceRequest,
    LeaveDetails, LeaveRequest, LeaveType, RequestPayload, RequestStatus, ReviewableRequest,
    Transition,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::{Money, Volume};
pub use types::*;
