//! # pumpdesk-db: Record Store for Pumpdesk
//!
//! SQLite storage for every station collection, accessed through sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Pumpdesk Data Flow                               │
//! │                                                                         │
//! │  backoffice service (save_reading, review_ticket, ...)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                   pumpdesk-db (THIS CRATE)                      │    │
//! │  │                                                                 │    │
//! │  │  ┌─────────────┐  ┌──────────────┐  ┌────────────┐  ┌────────┐  │    │
//! │  │  │  Database   │  │ Repositories │  │ WriteBatch │  │ Change │  │    │
//! │  │  │  (pool.rs)  │◄─│ readings     │─►│ (one tx,   │─►│  Feed  │  │    │
//! │  │  │  SqlitePool │  │ staff ...    │  │  publish   │  │        │  │    │
//! │  │  └─────────────┘  └──────────────┘  │  on commit)│  └───┬────┘  │    │
//! │  │                                     └────────────┘      │       │    │
//! │  │                                         Subscription<T> ◄┘       │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (platform data dir)  +  snapshot JSON files                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and repository accessors
//! - [`migrations`] - Embedded schema migrations
//! - [`batch`] - Multi-collection writes in one transaction
//! - [`feed`] - Change feed and live subscriptions
//! - [`snapshot`] - Offline fallback cache
//! - [`error`] - Database error types
//! - [`repository`] - One repository per collection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pumpdesk_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("pumpdesk.db")).await?;
//!
//! let mut staff = db.staff().subscribe();
//! while let Some(update) = staff.next().await {
//!     render(update?);
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod batch;
pub mod error;
pub mod feed;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use batch::WriteBatch;
pub use error::{DbError, DbResult};
pub use feed::{ChangeFeed, Collection, Subscription};
pub use pool::{Database, DbConfig};
pub use snapshot::{Snapshot, SnapshotCache};

pub use repository::attendance::AttendanceRepository;
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::intake::IntakeRepository;
pub use repository::reading::ReadingRepository;
pub use repository::request::RequestRepository;
pub use repository::staff::StaffRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
pub use repository::generate_id;
