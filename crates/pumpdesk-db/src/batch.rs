//! # Write Batches
//!
//! Several writes across collections committed as one SQLite transaction.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                   SINGLE TRANSACTION                                    │
//! │                                                                         │
//! │  1. UPDATE approvals SET status = 'Approved' WHERE status = 'Pending'   │
//! │  2. INSERT INTO expenses (kind = 'SALARY_ADVANCE', ...)                 │
//! │  3. UPDATE staff SET advance_taken = advance_taken + ?                  │
//! │                                                                         │
//! │  COMMIT ──► publish(approvals), publish(expenses), publish(staff)       │
//! │                                                                         │
//! │  Any step fails / batch dropped ──► ROLLBACK, nothing published         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::debug;

use crate::error::DbResult;
use crate::feed::{ChangeFeed, Collection};

/// An open transaction plus the collections it has touched.
///
/// Repository `*_in` methods write through [`WriteBatch::conn`] and record
/// the collection with [`WriteBatch::touch`]. Change notifications go out
/// only after [`WriteBatch::commit`].
///
/// The transaction is deferred: its first statement should be a write, so
/// that a competing writer waits on `busy_timeout`. A read first cannot be
/// upgraded while another connection holds the write lock.
pub struct WriteBatch {
    tx: Transaction<'static, Sqlite>,
    feed: ChangeFeed,
    touched: Vec<Collection>,
}

impl WriteBatch {
    pub(crate) async fn begin(pool: &SqlitePool, feed: &ChangeFeed) -> DbResult<Self> {
        let tx = pool.begin().await?;
        Ok(WriteBatch {
            tx,
            feed: feed.clone(),
            touched: Vec::new(),
        })
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut *self.tx
    }

    pub fn touch(&mut self, collection: Collection) {
        if !self.touched.contains(&collection) {
            self.touched.push(collection);
        }
    }

    pub async fn commit(self) -> DbResult<()> {
        let WriteBatch { tx, feed, touched } = self;
        tx.commit().await?;
        debug!(collections = ?touched, "Write batch committed");
        for collection in touched {
            feed.publish(collection);
        }
        Ok(())
    }

    /// Explicit rollback. Dropping the batch has the same effect.
    pub async fn rollback(self) -> DbResult<()> {
        self.tx.rollback().await?;
        debug!("Write batch rolled back");
        Ok(())
    }
}
