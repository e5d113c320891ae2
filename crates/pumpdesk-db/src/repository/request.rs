//! # Reviewable Request Repository
//!
//! One implementation backs both request tables (`approvals`,
//! `leave_requests`). The payload is stored as a JSON column; lifecycle
//! fields are real columns so the review guard can be enforced in SQL.
//!
//! ## Review Guard
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  admin A: UPDATE ... SET status='Approved' WHERE id=? AND status='Pending' → 1 row
//! │  admin B: UPDATE ... SET status='Rejected' WHERE id=? AND status='Pending' → 0 rows
//! │                                                         │               │
//! │                                                         ▼               │
//! │                                           DbError::Conflict             │
//! │                                                                         │
//! │  A request moves out of Pending exactly once.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::{RequestPayload, RequestStatus, ReviewableRequest, Role};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

#[derive(Debug, sqlx::FromRow)]
struct RequestRow {
    id: String,
    payload: String,
    status: RequestStatus,
    created_by_uid: String,
    created_by_name: String,
    created_by_role: Role,
    created_at: DateTime<Utc>,
    action_by: Option<String>,
    action_at: Option<DateTime<Utc>>,
}

impl RequestRow {
    fn into_request<P: RequestPayload>(self) -> DbResult<ReviewableRequest<P>> {
        Ok(ReviewableRequest {
            payload: serde_json::from_str(&self.payload)?,
            id: self.id,
            status: self.status,
            created_by_uid: self.created_by_uid,
            created_by_name: self.created_by_name,
            created_by_role: self.created_by_role,
            created_at: self.created_at,
            action_by: self.action_by,
            action_at: self.action_at,
        })
    }
}

/// Repository over one request table.
#[derive(Debug)]
pub struct RequestRepository<P> {
    pool: SqlitePool,
    feed: ChangeFeed,
    table: &'static str,
    collection: Collection,
    _payload: PhantomData<fn() -> P>,
}

impl<P> Clone for RequestRepository<P> {
    fn clone(&self) -> Self {
        RequestRepository {
            pool: self.pool.clone(),
            feed: self.feed.clone(),
            table: self.table,
            collection: self.collection,
            _payload: PhantomData,
        }
    }
}

impl<P: RequestPayload + 'static> RequestRepository<P> {
    pub fn new(
        pool: SqlitePool,
        feed: ChangeFeed,
        table: &'static str,
        collection: Collection,
    ) -> Self {
        RequestRepository {
            pool,
            feed,
            table,
            collection,
            _payload: PhantomData,
        }
    }

    pub fn collection(&self) -> Collection {
        self.collection
    }

    fn select(&self) -> String {
        format!(
            "SELECT id, payload, status, created_by_uid, created_by_name, created_by_role, \
             created_at, action_by, action_at FROM {}",
            self.table
        )
    }

    fn into_requests(rows: Vec<RequestRow>) -> DbResult<Vec<ReviewableRequest<P>>> {
        rows.into_iter().map(RequestRow::into_request).collect()
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<ReviewableRequest<P>>> {
        let row: Option<RequestRow> = sqlx::query_as(&format!("{} WHERE id = ?1", self.select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(RequestRow::into_request).transpose()
    }

    /// Every request, newest first. Callers filter by visibility.
    pub async fn list(&self) -> DbResult<Vec<ReviewableRequest<P>>> {
        let rows: Vec<RequestRow> =
            sqlx::query_as(&format!("{} ORDER BY created_at DESC", self.select()))
                .fetch_all(&self.pool)
                .await?;

        Self::into_requests(rows)
    }

    pub async fn insert(&self, request: &ReviewableRequest<P>) -> DbResult<()> {
        debug!(
            kind = P::KIND,
            id = %request.id,
            created_by = %request.created_by_uid,
            "Raising request"
        );

        let payload = serde_json::to_string(&request.payload)?;
        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        sqlx::query(&format!(
            r#"
            INSERT INTO {} (
                id, payload, status,
                created_by_uid, created_by_name, created_by_role,
                created_at, action_by, action_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            self.table
        ))
        .bind(&request.id)
        .bind(&payload)
        .bind(request.status)
        .bind(&request.created_by_uid)
        .bind(&request.created_by_name)
        .bind(request.created_by_role)
        .bind(request.created_at)
        .bind(&request.action_by)
        .bind(request.action_at)
        .execute(batch.conn())
        .await?;

        batch.touch(self.collection);
        batch.commit().await
    }

    /// Persists a reviewed request inside `batch`.
    ///
    /// The row must still be `Pending`; otherwise another reviewer got there
    /// first and this fails with [`DbError::Conflict`].
    pub async fn save_review_in(
        &self,
        batch: &mut WriteBatch,
        request: &ReviewableRequest<P>,
    ) -> DbResult<()> {
        debug!(
            kind = P::KIND,
            id = %request.id,
            status = %request.status,
            "Saving review"
        );

        let result = sqlx::query(&format!(
            r#"
            UPDATE {} SET status = ?2, action_by = ?3, action_at = ?4
            WHERE id = ?1 AND status = 'Pending'
            "#,
            self.table
        ))
        .bind(&request.id)
        .bind(request.status)
        .bind(&request.action_by)
        .bind(request.action_at)
        .execute(batch.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict(P::KIND, &request.id));
        }

        batch.touch(self.collection);
        Ok(())
    }

    pub fn subscribe(&self) -> Subscription<ReviewableRequest<P>> {
        let repo = self.clone();
        self.feed.subscribe(self.collection, move || {
            let repo = repo.clone();
            async move { repo.list().await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;
    use chrono::NaiveDate;
    use pumpdesk_core::{
        Actor, ApprovalCategory, Decision, FinanceRequest, LeaveDetails, LeaveType, Money,
    };

    fn actor(uid: &str, role: Role) -> Actor {
        Actor {
            uid: uid.to_string(),
            email: format!("{}@station.in", uid),
            name: uid.to_uppercase(),
            role,
        }
    }

    fn ticket(requester: &Actor) -> ReviewableRequest<FinanceRequest> {
        let payload = FinanceRequest::general(
            Money::from_rupees(2_500),
            ApprovalCategory::Maintenance,
            "Nozzle replacement",
        );
        ReviewableRequest::open(generate_id(), payload, requester, Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.approvals();
        let asha = actor("asha", Role::Manager);
        let ravi = actor("ravi", Role::Employee);

        repo.insert(&ticket(&asha)).await.unwrap();
        repo.insert(&ticket(&ravi)).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        let mine: Vec<_> = all.into_iter().filter(|r| r.created_by_uid == "ravi").collect();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].created_by_role, Role::Employee);
        assert_eq!(mine[0].payload.description, "Nozzle replacement");
    }

    #[tokio::test]
    async fn test_second_review_conflicts() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.approvals();
        let admin = actor("owner", Role::Admin);
        let stored = ticket(&actor("asha", Role::Manager));
        repo.insert(&stored).await.unwrap();

        let mut first = stored.clone();
        first.review(Decision::Approve, &admin, Utc::now()).unwrap();
        let mut batch = db.begin_batch().await.unwrap();
        repo.save_review_in(&mut batch, &first).await.unwrap();
        batch.commit().await.unwrap();

        // Reviewed from a stale copy that still reads Pending.
        let mut second = stored.clone();
        second.review(Decision::Reject, &admin, Utc::now()).unwrap();
        let mut batch = db.begin_batch().await.unwrap();
        let err = repo.save_review_in(&mut batch, &second).await.unwrap_err();
        assert!(matches!(err, DbError::Conflict { .. }));
        drop(batch);

        let reloaded = repo.get_by_id(&stored.id).await.unwrap().unwrap();
        assert_eq!(reloaded.status, RequestStatus::Approved);
        assert_eq!(reloaded.action_by.as_deref(), Some("OWNER"));
    }

    #[tokio::test]
    async fn test_leave_table_is_separate() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let details = LeaveDetails {
            start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
            leave_type: LeaveType::Casual,
            reason: "Family function".to_string(),
        };
        let leave = ReviewableRequest::open(
            generate_id(),
            details,
            &actor("ravi", Role::Employee),
            Utc::now(),
        )
        .unwrap();

        db.leaves().insert(&leave).await.unwrap();

        assert!(db.approvals().list().await.unwrap().is_empty());
        let stored = db.leaves().get_by_id(&leave.id).await.unwrap().unwrap();
        assert_eq!(stored.payload.days(), 3);
        assert_eq!(stored.status, RequestStatus::Pending);
    }
}
