//! # Services
//!
//! Role-checked operations over the record store. Each function takes the
//! application state and the verified caller; derived numbers always come
//! from `pumpdesk_core::ledger`.
//!
//! ```text
//! services/
//! ├── readings.rs    ◄─── daily meter readings (upsert by date)
//! ├── intakes.rs     ◄─── tanker deliveries, tank stock
//! ├── khata.rs       ◄─── customers, credit lines, balances
//! ├── staff.rs       ◄─── roster, payable, direct advances
//! ├── expenses.rs    ◄─── running costs, monthly total
//! ├── requests.rs    ◄─── approval tickets and leave requests
//! └── attendance.rs  ◄─── daily marks and stats
//! ```
//!
//! ## Who May Write
//! | Operation                         | Roles              |
//! |-----------------------------------|--------------------|
//! | readings, intakes, khata, staff,  | admin, manager     |
//! | expenses, attendance              |                    |
//! | deletes, reviews, direct advances | admin              |
//! | raising tickets and leaves        | manager, employee  |

pub mod attendance;
pub mod expenses;
pub mod intakes;
pub mod khata;
pub mod readings;
pub mod requests;
pub mod staff;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use pumpdesk_db::{Collection, DbResult};

use crate::error::ServiceResult;
use crate::state::AppState;

/// Refreshes the offline snapshot from a successful full-collection read,
/// or answers from the snapshot when the store is unreachable.
pub(crate) async fn with_snapshot_fallback<T>(
    state: &AppState,
    collection: Collection,
    fetched: DbResult<Vec<T>>,
) -> ServiceResult<Vec<T>>
where
    T: Serialize + DeserializeOwned,
{
    match fetched {
        Ok(records) => {
            if let Err(e) = state.snapshots().store(collection, &records).await {
                debug!(collection = %collection, error = %e, "Snapshot not refreshed");
            }
            Ok(records)
        }
        Err(err) if err.is_retryable() => match state.snapshots().load::<T>(collection).await {
            Ok(Some(snapshot)) => {
                warn!(
                    collection = %collection,
                    saved_at = %snapshot.saved_at,
                    error = %err,
                    "Store unreachable, serving snapshot"
                );
                Ok(snapshot.records)
            }
            _ => Err(err.into()),
        },
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ErrorCode, ServiceError};
    use crate::services::khata::{add_customer, list_customers};
    use crate::testing::{actor, test_state};
    use pumpdesk_core::Role;

    #[tokio::test]
    async fn test_lists_fall_back_to_snapshot_when_store_is_closed() {
        let (_dir, state) = test_state().await;
        let manager = actor(Role::Manager);
        add_customer(&state, &manager, "Sharma Transport").await.unwrap();

        let live = list_customers(&state, &manager).await.unwrap();
        assert_eq!(live.len(), 1);

        state.db().close().await;

        let cached = list_customers(&state, &manager).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].name, "Sharma Transport");

        let err = add_customer(&state, &manager, "Gupta Logistics").await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::Unavailable);
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_no_snapshot_means_the_error_surfaces() {
        let (_dir, state) = test_state().await;
        state.db().close().await;

        let err = list_customers(&state, &actor(Role::Manager)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unavailable(_)));
    }

    #[tokio::test]
    async fn test_non_retryable_errors_skip_the_snapshot() {
        let (_dir, state) = test_state().await;
        let stored = vec!["cached".to_string()];
        with_snapshot_fallback(&state, Collection::Customers, Ok(stored))
            .await
            .unwrap();

        let failed: DbResult<Vec<String>> = Err(pumpdesk_db::DbError::QueryFailed("bad column".into()));
        let err = with_snapshot_fallback(&state, Collection::Customers, failed)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::Internal);
    }
}
