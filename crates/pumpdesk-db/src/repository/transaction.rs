//! # Transaction Repository
//!
//! Khata lines. Append-only; every line belongs to exactly one customer
//! (enforced by a foreign key).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::{Money, Transaction, TransactionKind};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

const SELECT_TRANSACTION: &str = r#"
    SELECT id, customer_id, kind, amount, date, note, receipt_ref, created_at
    FROM transactions
"#;

#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: String,
    customer_id: String,
    kind: TransactionKind,
    amount: i64,
    date: NaiveDate,
    note: String,
    receipt_ref: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for Transaction {
    fn from(row: TransactionRow) -> Self {
        Transaction {
            id: row.id,
            customer_id: row.customer_id,
            kind: row.kind,
            amount: Money::from_paise(row.amount),
            date: row.date,
            note: row.note,
            receipt_ref: row.receipt_ref,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransactionRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl TransactionRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        TransactionRepository { pool, feed }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Transaction>> {
        let row: Option<TransactionRow> =
            sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_TRANSACTION))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Transaction::from))
    }

    /// One customer's khata, newest first.
    pub async fn list_for_customer(&self, customer_id: &str) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{} WHERE customer_id = ?1 ORDER BY date DESC, created_at DESC",
            SELECT_TRANSACTION
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    /// Every khata line in the station, newest first.
    pub async fn list(&self) -> DbResult<Vec<Transaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "{} ORDER BY date DESC, created_at DESC",
            SELECT_TRANSACTION
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Transaction::from).collect())
    }

    /// Appends a line. Fails with `ForeignKeyViolation` for an unknown
    /// customer.
    pub async fn insert(&self, tx: &Transaction) -> DbResult<()> {
        debug!(
            id = %tx.id,
            customer_id = %tx.customer_id,
            kind = ?tx.kind,
            amount = %tx.amount,
            "Recording khata transaction"
        );

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        sqlx::query(
            r#"
            INSERT INTO transactions (
                id, customer_id, kind, amount, date, note, receipt_ref, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&tx.id)
        .bind(&tx.customer_id)
        .bind(tx.kind)
        .bind(tx.amount.paise())
        .bind(tx.date)
        .bind(&tx.note)
        .bind(&tx.receipt_ref)
        .bind(tx.created_at)
        .execute(batch.conn())
        .await?;

        batch.touch(Collection::Transactions);
        batch.commit().await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting khata transaction");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let result = sqlx::query("DELETE FROM transactions WHERE id = ?1")
            .bind(id)
            .execute(batch.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Transaction", id));
        }

        batch.touch(Collection::Transactions);
        batch.commit().await
    }

    pub fn subscribe(&self) -> Subscription<Transaction> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Transactions, move || {
            let repo = repo.clone();
            async move { repo.list().await }
        })
    }

    pub fn subscribe_for_customer(&self, customer_id: impl Into<String>) -> Subscription<Transaction> {
        let repo = self.clone();
        let customer_id = customer_id.into();
        self.feed.subscribe(Collection::Transactions, move || {
            let repo = repo.clone();
            let customer_id = customer_id.clone();
            async move { repo.list_for_customer(&customer_id).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;
    use pumpdesk_core::Customer;

    fn line(customer_id: &str, kind: TransactionKind, rupees: i64) -> Transaction {
        Transaction {
            id: generate_id(),
            customer_id: customer_id.to_string(),
            kind,
            amount: Money::from_rupees(rupees),
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            note: String::new(),
            receipt_ref: None,
            created_at: Utc::now(),
        }
    }

    async fn with_customer(db: &Database, id: &str) {
        db.customers()
            .insert(&Customer {
                id: id.to_string(),
                name: id.to_uppercase(),
                created_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_lines_are_scoped_to_customer() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        with_customer(&db, "c1").await;
        with_customer(&db, "c2").await;
        let repo = db.transactions();

        repo.insert(&line("c1", TransactionKind::Fuel, 500)).await.unwrap();
        repo.insert(&line("c1", TransactionKind::Payment, 100)).await.unwrap();
        repo.insert(&line("c2", TransactionKind::Fuel, 900)).await.unwrap();

        assert_eq!(repo.list_for_customer("c1").await.unwrap().len(), 2);
        assert_eq!(repo.list().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_unknown_customer_is_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let err = db
            .transactions()
            .insert(&line("ghost", TransactionKind::Fuel, 10))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::ForeignKeyViolation { .. }));
    }

    #[tokio::test]
    async fn test_customer_delete_cascades() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        with_customer(&db, "c1").await;
        db.transactions()
            .insert(&line("c1", TransactionKind::Fuel, 500))
            .await
            .unwrap();

        db.customers().delete("c1").await.unwrap();
        assert!(db.transactions().list().await.unwrap().is_empty());
    }
}
