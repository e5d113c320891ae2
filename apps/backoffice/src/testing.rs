//! Fixtures shared by the unit tests.

use pumpdesk_core::{Actor, Role};

use crate::identity::Caller;
use tempfile::TempDir;

use crate::config::BackofficeConfig;
use crate::state::AppState;

/// An in-memory state whose snapshot directory lives as long as the guard.
pub(crate) async fn test_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::init(BackofficeConfig::for_tests(dir.path()))
        .await
        .unwrap();
    (dir, state)
}

/// A state over a database file, so several connections really compete.
pub(crate) async fn file_state() -> (TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let config = BackofficeConfig {
        db_path: Some(dir.path().join("pumpdesk.db")),
        ..BackofficeConfig::for_tests(dir.path().join("snapshots"))
    };
    let state = AppState::init(config).await.unwrap();
    (dir, state)
}

pub(crate) fn actor(role: Role) -> Caller {
    Caller::verified(Actor {
        uid: format!("{}-uid", role),
        email: format!("{}@station.in", role),
        name: format!("Test {}", role),
        role,
    })
}
