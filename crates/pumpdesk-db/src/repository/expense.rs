//! # Expense Repository
//!
//! Outgoing payments. Append-only. `SALARY_ADVANCE` rows are written only
//! alongside a staff advance update, through [`ExpenseRepository::insert_in`].

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::{Expense, ExpenseKind, Money};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

const SELECT_EXPENSE: &str = r#"
    SELECT id, kind, description, amount, date, staff_id, created_by, receipt_ref, created_at
    FROM expenses
"#;

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    kind: ExpenseKind,
    description: String,
    amount: i64,
    date: NaiveDate,
    staff_id: Option<String>,
    created_by: String,
    receipt_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            kind: row.kind,
            description: row.description,
            amount: Money::from_paise(row.amount),
            date: row.date,
            staff_id: row.staff_id,
            created_by: row.created_by,
            receipt_ref: row.receipt_ref,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ExpenseRepository { pool, feed }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let row: Option<ExpenseRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_EXPENSE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Expense::from))
    }

    /// Every expense of both kinds, newest first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(&format!(
            "{} ORDER BY date DESC, created_at DESC",
            SELECT_EXPENSE
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Expense::from).collect())
    }

    /// Advance history for one staff member, newest first.
    pub async fn list_for_staff(&self, staff_id: &str) -> DbResult<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(&format!(
            "{} WHERE staff_id = ?1 ORDER BY date DESC, created_at DESC",
            SELECT_EXPENSE
        ))
        .bind(staff_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Expense::from).collect())
    }

    pub async fn insert(&self, expense: &Expense) -> DbResult<()> {
        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        Self::insert_in(&mut batch, expense).await?;
        batch.commit().await
    }

    pub async fn insert_in(batch: &mut WriteBatch, expense: &Expense) -> DbResult<()> {
        debug!(
            id = %expense.id,
            kind = ?expense.kind,
            amount = %expense.amount,
            "Recording expense"
        );

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, kind, description, amount, date,
                staff_id, created_by, receipt_ref, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&expense.id)
        .bind(expense.kind)
        .bind(&expense.description)
        .bind(expense.amount.paise())
        .bind(expense.date)
        .bind(&expense.staff_id)
        .bind(&expense.created_by)
        .bind(&expense.receipt_ref)
        .bind(expense.created_at)
        .execute(batch.conn())
        .await?;

        batch.touch(Collection::Expenses);
        Ok(())
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting expense");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(batch.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        batch.touch(Collection::Expenses);
        batch.commit().await
    }

    pub fn subscribe(&self) -> Subscription<Expense> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Expenses, move || {
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
    use pumpdesk_core::StaffRef;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn running_cost(rupees: i64, d: u32) -> Expense {
        Expense {
            id: generate_id(),
            kind: ExpenseKind::Expense,
            description: "Generator diesel".to_string(),
            amount: Money::from_rupees(rupees),
            date: day(d),
            staff_id: None,
            created_by: "Owner".to_string(),
            receipt_ref: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_list_mixes_both_kinds() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();
        let ravi = StaffRef {
            id: "s1".to_string(),
            name: "Ravi".to_string(),
        };

        repo.insert(&running_cost(400, 1)).await.unwrap();
        repo.insert(&Expense::salary_advance(
            generate_id(),
            &ravi,
            Money::from_rupees(1_000),
            day(4),
            "Owner",
            Utc::now(),
        ))
        .await
        .unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].kind, ExpenseKind::SalaryAdvance);
        assert_eq!(all[0].description, "Advance to Ravi");

        let history = repo.list_for_staff("s1").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].amount, Money::from_rupees(1_000));
    }

    #[tokio::test]
    async fn test_advance_without_staff_is_rejected_by_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let mut orphan = running_cost(100, 2);
        orphan.kind = ExpenseKind::SalaryAdvance;

        assert!(db.expenses().insert(&orphan).await.is_err());
        assert!(db.expenses().list().await.unwrap().is_empty());
    }
}
