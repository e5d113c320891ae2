//! # Repository Module
//!
//! One repository per collection.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Collection Contract                                  │
//! │                                                                         │
//! │  service                                                                │
//! │     │  db.staff().get_by_id("s1")                                       │
//! │     ▼                                                                   │
//! │  XxxRepository                                                          │
//! │  ├── insert / upsert        (write, then publish on the change feed)    │
//! │  ├── delete                 (NotFound when nothing matched)             │
//! │  ├── get_by_id              (Option)                                    │
//! │  ├── list / list_for_*      (documented order)                          │
//! │  ├── *_in(&mut WriteBatch)  (same write inside a caller's transaction)  │
//! │  └── subscribe*             (live full result sets)                     │
//! │     │                                                                   │
//! │     ▼                                                                   │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Plain writes open their own single-statement [`WriteBatch`] so every
//! change, batched or not, is announced only after it commits.
//!
//! [`WriteBatch`]: crate::batch::WriteBatch

pub mod attendance;
pub mod customer;
pub mod expense;
pub mod intake;
pub mod reading;
pub mod request;
pub mod staff;
pub mod transaction;
pub mod user;

use uuid::Uuid;

/// New record id.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
