//! # Staff Repository
//!
//! Payroll records. The only in-place update is recording an advance.
//!
//! ## Advance Update
//! ```text
//! UPDATE staff SET
//!     advance_taken  = advance_taken + :amount,
//!     payable_salary = monthly_salary - (advance_taken + :amount)
//! WHERE id = :id
//! ```
//! One statement: the increment is computed by SQLite against the current
//! row, so two advances committed back to back both land.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use pumpdesk_core::{Money, StaffMember};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

const SELECT_STAFF: &str = r#"
    SELECT id, name, role, email, monthly_salary, advance_taken, payable_salary, created_at
    FROM staff
"#;

#[derive(Debug, sqlx::FromRow)]
struct StaffRow {
    id: String,
    name: String,
    role: String,
    email: String,
    monthly_salary: i64,
    advance_taken: i64,
    payable_salary: Option<i64>,
    created_at: DateTime<Utc>,
}

impl From<StaffRow> for StaffMember {
    fn from(row: StaffRow) -> Self {
        StaffMember {
            id: row.id,
            name: row.name,
            role: row.role,
            email: row.email,
            monthly_salary: Money::from_paise(row.monthly_salary),
            advance_taken: Money::from_paise(row.advance_taken),
            payable_salary: row.payable_salary.map(Money::from_paise),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StaffRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl StaffRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        StaffRepository { pool, feed }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StaffMember>> {
        let row: Option<StaffRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_STAFF))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(StaffMember::from))
    }

    /// All staff, alphabetical.
    pub async fn list(&self) -> DbResult<Vec<StaffMember>> {
        let rows: Vec<StaffRow> =
            sqlx::query_as(&format!("{} ORDER BY name COLLATE NOCASE", SELECT_STAFF))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(StaffMember::from).collect())
    }

    pub async fn insert(&self, staff: &StaffMember) -> DbResult<()> {
        debug!(id = %staff.id, name = %staff.name, "Adding staff member");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        sqlx::query(
            r#"
            INSERT INTO staff (
                id, name, role, email,
                monthly_salary, advance_taken, payable_salary, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&staff.id)
        .bind(&staff.name)
        .bind(&staff.role)
        .bind(&staff.email)
        .bind(staff.monthly_salary.paise())
        .bind(staff.advance_taken.paise())
        .bind(staff.payable_salary.map(|m| m.paise()))
        .bind(staff.created_at)
        .execute(batch.conn())
        .await?;

        batch.touch(Collection::Staff);
        batch.commit().await
    }

    /// Adds `amount` to the member's advances inside `batch` and refreshes
    /// the payable cache.
    ///
    /// ## Returns
    /// The member as it will read after commit.
    pub async fn apply_advance_in(
        batch: &mut WriteBatch,
        staff_id: &str,
        amount: Money,
    ) -> DbResult<StaffMember> {
        info!(staff_id = %staff_id, amount = %amount, "Applying salary advance");

        let result = sqlx::query(
            r#"
            UPDATE staff SET
                advance_taken = advance_taken + ?2,
                payable_salary = monthly_salary - (advance_taken + ?2)
            WHERE id = ?1
            "#,
        )
        .bind(staff_id)
        .bind(amount.paise())
        .execute(batch.conn())
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff", staff_id));
        }

        let row: StaffRow = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_STAFF))
            .bind(staff_id)
            .fetch_one(batch.conn())
            .await?;

        batch.touch(Collection::Staff);
        Ok(StaffMember::from(row))
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting staff member");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let result = sqlx::query("DELETE FROM staff WHERE id = ?1")
            .bind(id)
            .execute(batch.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Staff", id));
        }

        batch.touch(Collection::Staff);
        batch.commit().await
    }

    pub fn subscribe(&self) -> Subscription<StaffMember> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Staff, move || {
            let repo = repo.clone();
            async move { repo.list().await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn member(id: &str, salary_rupees: i64) -> StaffMember {
        StaffMember {
            id: id.to_string(),
            name: id.to_uppercase(),
            role: "Attendant".to_string(),
            email: format!("{}@station.in", id),
            monthly_salary: Money::from_rupees(salary_rupees),
            advance_taken: Money::zero(),
            payable_salary: Some(Money::from_rupees(salary_rupees)),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_apply_advance_accumulates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.staff().insert(&member("s1", 10_000)).await.unwrap();

        for rupees in [2_000, 500] {
            let mut batch = db.begin_batch().await.unwrap();
            StaffRepository::apply_advance_in(&mut batch, "s1", Money::from_rupees(rupees))
                .await
                .unwrap();
            batch.commit().await.unwrap();
        }

        let s1 = db.staff().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(s1.advance_taken, Money::from_rupees(2_500));
        assert_eq!(s1.payable_salary, Some(Money::from_rupees(7_500)));
    }

    #[tokio::test]
    async fn test_rolled_back_advance_leaves_no_trace() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.staff().insert(&member("s1", 10_000)).await.unwrap();

        let mut batch = db.begin_batch().await.unwrap();
        let preview = StaffRepository::apply_advance_in(&mut batch, "s1", Money::from_rupees(900))
            .await
            .unwrap();
        assert_eq!(preview.advance_taken, Money::from_rupees(900));
        batch.rollback().await.unwrap();

        let s1 = db.staff().get_by_id("s1").await.unwrap().unwrap();
        assert_eq!(s1.advance_taken, Money::zero());
    }

    #[tokio::test]
    async fn test_advance_for_unknown_staff() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut batch = db.begin_batch().await.unwrap();
        let err = StaffRepository::apply_advance_in(&mut batch, "ghost", Money::from_rupees(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
