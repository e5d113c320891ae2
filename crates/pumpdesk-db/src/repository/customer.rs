//! # Customer Repository
//!
//! Khata customers. Deleting a customer cascades to their transactions.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::Customer;

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        CustomerRepository { pool, feed }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let row: Option<CustomerRow> =
            sqlx::query_as("SELECT id, name, created_at FROM customers WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Customer::from))
    }

    /// All customers, most recently added first.
    pub async fn list(&self) -> DbResult<Vec<Customer>> {
        let rows: Vec<CustomerRow> =
            sqlx::query_as("SELECT id, name, created_at FROM customers ORDER BY created_at DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    /// Case-insensitive substring match on the name, alphabetical.
    ///
    /// An empty query returns every customer.
    pub async fn search_by_name(&self, query: &str) -> DbResult<Vec<Customer>> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{}%", escaped);

        let rows: Vec<CustomerRow> = sqlx::query_as(
            r#"
            SELECT id, name, created_at FROM customers
            WHERE name LIKE ?1 ESCAPE '\'
            ORDER BY name COLLATE NOCASE
            "#,
        )
        .bind(pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Customer::from).collect())
    }

    pub async fn insert(&self, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.name, "Adding customer");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        sqlx::query("INSERT INTO customers (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&customer.id)
            .bind(&customer.name)
            .bind(customer.created_at)
            .execute(batch.conn())
            .await?;

        batch.touch(Collection::Customers);
        batch.commit().await
    }

    /// Removes the customer and, by cascade, their khata.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting customer");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(batch.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        batch.touch(Collection::Customers);
        batch.touch(Collection::Transactions);
        batch.commit().await
    }

    pub fn subscribe(&self) -> Subscription<Customer> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Customers, move || {
            let repo = repo.clone();
            async move { repo.list().await }
        })
    }
}
