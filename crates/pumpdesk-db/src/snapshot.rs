//! # Snapshot Cache
//!
//! Last-known result sets written to disk as JSON, one file per collection.
//! Read back only when the store itself cannot answer; never authoritative.
//!
//! ```text
//! <dir>/
//!   readings.json      { "saved_at": "...", "records": [ ... ] }
//!   expenses.json
//!   ...
//! ```
//!
//! Writes go to `<name>.json.tmp` first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{DbError, DbResult};
use crate::feed::Collection;

/// A stored result set and when it was taken.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot<T> {
    pub saved_at: DateTime<Utc>,
    pub records: Vec<T>,
}

/// Directory of per-collection snapshot files.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    dir: PathBuf,
}

impl SnapshotCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        SnapshotCache { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, collection: Collection) -> PathBuf {
        self.dir.join(format!("{}.json", collection.as_str()))
    }

    /// Replaces the snapshot for `collection`.
    pub async fn store<T: Serialize>(
        &self,
        collection: Collection,
        records: &[T],
    ) -> DbResult<()> {
        #[derive(Serialize)]
        struct SnapshotRef<'a, T> {
            saved_at: DateTime<Utc>,
            records: &'a [T],
        }

        let body = serde_json::to_vec(&SnapshotRef {
            saved_at: Utc::now(),
            records,
        })?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| DbError::Snapshot(e.to_string()))?;

        let path = self.path_for(collection);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &body)
            .await
            .map_err(|e| DbError::Snapshot(e.to_string()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| DbError::Snapshot(e.to_string()))?;

        debug!(collection = %collection, records = records.len(), "Snapshot stored");
        Ok(())
    }

    /// The last snapshot for `collection`, or `None` if there is none.
    pub async fn load<T: DeserializeOwned>(
        &self,
        collection: Collection,
    ) -> DbResult<Option<Snapshot<T>>> {
        let path = self.path_for(collection);
        let body = match tokio::fs::read(&path).await {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(DbError::Snapshot(e.to_string())),
        };

        match serde_json::from_slice(&body) {
            Ok(snapshot) => Ok(Some(snapshot)),
            Err(e) => {
                warn!(collection = %collection, error = %e, "Discarding unreadable snapshot");
                Ok(None)
            }
        }
    }

    pub async fn clear(&self, collection: Collection) -> DbResult<()> {
        match tokio::fs::remove_file(self.path_for(collection)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DbError::Snapshot(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pumpdesk_core::{Customer, Money, StaffRef};

    #[tokio::test]
    async fn test_store_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path().join("snapshots"));
        let customers = vec![Customer {
            id: "c1".to_string(),
            name: "Verma Logistics".to_string(),
            created_at: Utc::now(),
        }];

        cache.store(Collection::Customers, &customers).await.unwrap();
        let loaded: Snapshot<Customer> = cache.load(Collection::Customers).await.unwrap().unwrap();

        assert_eq!(loaded.records, customers);
        let staff: Option<Snapshot<StaffRef>> = cache.load(Collection::Staff).await.unwrap();
        assert!(staff.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = SnapshotCache::new(dir.path());
        tokio::fs::write(dir.path().join("expenses.json"), b"{not json")
            .await
            .unwrap();

        let loaded: Option<Snapshot<Money>> = cache.load(Collection::Expenses).await.unwrap();
        assert!(loaded.is_none());

        cache.clear(Collection::Expenses).await.unwrap();
        cache.clear(Collection::Expenses).await.unwrap();
    }
}
