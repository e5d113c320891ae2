//! # Application State
//!
//! One explicit state object per process (or per test), built by
//! [`AppState::init`] and torn down by [`AppState::dispose`].
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    AppState                                             │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────────┐  ┌──────────────────────┐   │
//! │  │   Database   │  │ LocalIdentityProvider│  │    SnapshotCache     │   │
//! │  │  pool + feed │  │  sessions, watch of  │  │  offline fallback    │   │
//! │  │              │  │  current identity    │  │  per collection      │   │
//! │  └──────────────┘  └──────────────────────┘  └──────────────────────┘   │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │  Station: pumps (static), tank capacities (config)                │   │
//! │  └──────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  Passed by reference to every service call. No globals.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Local, NaiveDate};
use tracing::info;

use pumpdesk_core::ledger::TankCapacities;
use pumpdesk_core::{default_pumps, Pump};
use pumpdesk_db::{Database, DbConfig, SnapshotCache};

use crate::config::BackofficeConfig;
use crate::error::ServiceResult;
use crate::identity::{Caller, LocalIdentityProvider};

pub struct AppState {
    config: BackofficeConfig,
    db: Database,
    identity: LocalIdentityProvider,
    snapshots: SnapshotCache,
    pumps: Vec<Pump>,
}

impl AppState {
    /// Opens the store (running migrations) and wires up the providers.
    pub async fn init(config: BackofficeConfig) -> ServiceResult<Self> {
        let db_config = match &config.db_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() {
                        std::fs::create_dir_all(parent).map_err(|e| {
                            crate::error::ServiceError::Unavailable(format!(
                                "Cannot create {}: {}",
                                parent.display(),
                                e
                            ))
                        })?;
                    }
                }
                DbConfig::new(path)
            }
            None => DbConfig::in_memory(),
        };

        let db = Database::new(db_config).await?;
        let identity = LocalIdentityProvider::new(db.users(), &config);
        let snapshots = SnapshotCache::new(&config.snapshot_dir);

        info!(
            db = ?config.db_path,
            snapshots = %config.snapshot_dir.display(),
            "Application state initialized"
        );

        Ok(AppState {
            config,
            db,
            identity,
            snapshots,
            pumps: default_pumps(),
        })
    }

    /// Signs out and closes the pool. Live views must be closed first.
    pub async fn dispose(self) {
        self.identity.sign_out();
        self.db.close().await;
        info!("Application state disposed");
    }

    pub fn config(&self) -> &BackofficeConfig {
        &self.config
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn identity(&self) -> &LocalIdentityProvider {
        &self.identity
    }

    pub fn snapshots(&self) -> &SnapshotCache {
        &self.snapshots
    }

    pub fn pumps(&self) -> &[Pump] {
        &self.pumps
    }

    pub fn capacities(&self) -> TankCapacities {
        self.config.capacities
    }

    /// Resolves a session token to the verified caller.
    pub async fn caller(&self, token: &str) -> ServiceResult<Caller> {
        self.identity.verify(token).await
    }
}

/// The station's calendar date. "Today" lookups compare local dates, never
/// timestamps.
pub fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
