//! # Change Feed & Subscriptions
//!
//! Live query results for views that must re-render when data changes.
//!
//! ## How A Subscription Works
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Change Feed Fan-out                                 │
//! │                                                                         │
//! │  repository write ──► COMMIT ──► ChangeFeed::publish(Collection)        │
//! │                                        │  (tokio broadcast)             │
//! │                 ┌──────────────────────┼──────────────────────┐         │
//! │                 ▼                      ▼                      ▼         │
//! │        Subscription<Reading>  Subscription<Expense>  Subscription<...> │
//! │          tag matches?            tag matches?                           │
//! │             │ yes                   │ no → ignore                       │
//! │             ▼                                                           │
//! │        re-run query ──► push FULL result set ──► consumer.next()        │
//! │                                                                         │
//! │  First delivery: the full result set at subscribe time.                 │
//! │  close() / drop: the query task is aborted; no further deliveries.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Deliveries within one subscription are produced by a single task that
//! re-runs its query after each relevant commit, so each push reflects a
//! view at least as new as the previous one. Nothing is ordered across
//! subscriptions.

use std::fmt;
use std::future::Future;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DbResult;

/// Broadcast buffer. A lagging subscriber just re-queries.
const FEED_CAPACITY: usize = 256;

/// Result sets buffered per subscription before the producer waits.
const SUBSCRIPTION_BUFFER: usize = 8;

// =============================================================================
// Collection
// =============================================================================

/// Independent collections of the record store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Readings,
    FuelIntakes,
    Customers,
    Transactions,
    Staff,
    Expenses,
    Approvals,
    Leaves,
    Attendance,
    Users,
}

impl Collection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Readings => "readings",
            Collection::FuelIntakes => "fuel_intakes",
            Collection::Customers => "customers",
            Collection::Transactions => "transactions",
            Collection::Staff => "staff",
            Collection::Expenses => "expenses",
            Collection::Approvals => "approvals",
            Collection::Leaves => "leaves",
            Collection::Attendance => "attendance",
            Collection::Users => "users",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Change Feed
// =============================================================================

/// Process-wide notification channel: "collection X changed".
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<Collection>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(FEED_CAPACITY);
        ChangeFeed { tx }
    }

    /// Announces a committed change. Called only after COMMIT.
    pub fn publish(&self, collection: Collection) {
        // No receivers is fine: nobody is watching.
        let receivers = self.tx.send(collection).unwrap_or(0);
        debug!(%collection, receivers, "Change published");
    }

    /// Raw receiver of change tags.
    pub fn listen(&self) -> broadcast::Receiver<Collection> {
        self.tx.subscribe()
    }

    /// Starts a live query over `collection`.
    ///
    /// `query` is re-run for the initial delivery and after every committed
    /// change to `collection`. It must capture everything it needs (filter
    /// values, a repository handle) by value.
    pub fn subscribe<T, F, Fut>(&self, collection: Collection, query: F) -> Subscription<T>
    where
        T: Send + 'static,
        F: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = DbResult<Vec<T>>> + Send + 'static,
    {
        // Listen before the first query so no commit slips between them.
        let mut changes = self.listen();
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);

        let task = tokio::spawn(async move {
            debug!(%collection, "Subscription started");

            if tx.send(query().await).await.is_err() {
                return;
            }

            loop {
                match changes.recv().await {
                    Ok(changed) if changed == collection => {}
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(%collection, skipped, "Subscription lagged; refreshing");
                    }
                    Err(RecvError::Closed) => break,
                }

                // Coalesce a burst of commits into one refresh.
                loop {
                    match changes.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(TryRecvError::Empty) => break,
                        Err(TryRecvError::Closed) => break,
                    }
                }

                if tx.send(query().await).await.is_err() {
                    break;
                }
            }

            debug!(%collection, "Subscription ended");
        });

        Subscription {
            collection,
            rx,
            task: Some(task),
        }
    }
}

// =============================================================================
// Subscription
// =============================================================================

/// A cancelable stream of full result sets.
///
/// Each item is the complete current result of the query, or the store
/// error that prevented producing it. Errors do not end the subscription.
pub struct Subscription<T> {
    collection: Collection,
    rx: mpsc::Receiver<DbResult<Vec<T>>>,
    task: Option<JoinHandle<()>>,
}

impl<T> Subscription<T> {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Waits for the next result set. `None` once closed.
    pub async fn next(&mut self) -> Option<DbResult<Vec<T>>> {
        self.rx.recv().await
    }

    pub fn is_closed(&self) -> bool {
        self.task.is_none()
    }

    /// Stops the subscription. Calling it again is a no-op.
    pub fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            self.rx.close();
            debug!(collection = %self.collection, "Subscription closed");
        }
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<T> fmt::Debug for Subscription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("collection", &self.collection)
            .field("closed", &self.is_closed())
            .finish()
    }
}
