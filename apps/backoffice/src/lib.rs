//! # Pumpdesk Backoffice
//!
//! Application layer of the station back office: one explicit state
//! object, the local identity provider, role-checked services and live
//! views over the record store.
//!
//! ## Module Organization
//! ```text
//! backoffice/
//! ├── lib.rs          ◄─── You are here (exports, tracing setup)
//! ├── config.rs       ◄─── Environment configuration
//! ├── state.rs        ◄─── AppState: init / dispose
//! ├── identity.rs     ◄─── argon2 credentials, JWT sessions
//! ├── provisioning.rs ◄─── Admin-only staff login creation
//! ├── hooks.rs        ◄─── Post-approval side effects
//! ├── services/       ◄─── Readings, khata, staff, requests ...
//! ├── dashboard.rs    ◄─── Live recomputed overview
//! └── error.rs        ◄─── ServiceError for the presentation layer
//! ```
//!
//! ## Typical Session
//! ```rust,no_run
//! use backoffice::{AppState, BackofficeConfig};
//! use backoffice::services::readings;
//!
//! # async fn run() -> Result<(), backoffice::ServiceError> {
//! let state = AppState::init(BackofficeConfig::from_env().unwrap_or_default()).await?;
//! let session = state.identity().authenticate("owner@station.in", "s3cret!").await?;
//! let actor = state.caller(&session.token).await?;
//! let today = readings::todays_reading(&state, &actor).await?;
//! state.dispose().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dashboard;
pub mod error;
pub mod hooks;
pub mod identity;
pub mod provisioning;
pub mod services;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

use tracing_subscriber::EnvFilter;

pub use config::{BackofficeConfig, ConfigError};
pub use dashboard::{DashboardView, LiveDashboard};
pub use error::{ErrorCode, ServiceError, ServiceResult};
pub use hooks::{ApprovalHook, SalaryAdvanceHook};
pub use identity::{Caller, LocalIdentityProvider, Session};
pub use provisioning::{bootstrap_admin, create_staff_login};
pub use state::{local_today, AppState};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=pumpdesk_db=trace` - Show trace for the store only
/// - Default: `info,pumpdesk=debug,backoffice=debug,sqlx=warn`
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,pumpdesk=debug,backoffice=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
