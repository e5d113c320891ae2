//! # Reading Repository
//!
//! Daily meter readings, one per calendar date.
//!
//! ## Replace-On-Edit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  upsert(reading for 2024-01-01)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... ON CONFLICT(date) DO UPDATE ... RETURNING id, created_at    │
//! │       │                                                                 │
//! │       ├── new date  → row inserted with the draft's id                  │
//! │       └── same date → row updated; id and created_at are kept           │
//! │                                                                         │
//! │  A UNIQUE index on date backs this. Concurrent saves queue on the       │
//! │  write lock and the last one to commit wins.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::ledger::select_reading_for_date;
use pumpdesk_core::{Money, Reading, Volume};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

const SELECT_READING: &str = r#"
    SELECT
        id, date, pumps,
        petrol_price, diesel_price,
        total_petrol, total_diesel, total_usage, total_revenue,
        created_at, updated_at
    FROM readings
"#;

#[derive(Debug, sqlx::FromRow)]
struct ReadingRow {
    id: String,
    date: NaiveDate,
    pumps: String,
    petrol_price: i64,
    diesel_price: i64,
    total_petrol: i64,
    total_diesel: i64,
    total_usage: i64,
    total_revenue: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = DbError;

    fn try_from(row: ReadingRow) -> Result<Self, Self::Error> {
        Ok(Reading {
            pumps: serde_json::from_str(&row.pumps)?,
            id: row.id,
            date: row.date,
            petrol_price: Money::from_paise(row.petrol_price),
            diesel_price: Money::from_paise(row.diesel_price),
            total_petrol: Volume::from_millilitres(row.total_petrol),
            total_diesel: Volume::from_millilitres(row.total_diesel),
            total_usage: Volume::from_millilitres(row.total_usage),
            total_revenue: Money::from_paise(row.total_revenue),
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_readings(rows: Vec<ReadingRow>) -> DbResult<Vec<Reading>> {
    rows.into_iter().map(Reading::try_from).collect()
}

/// Repository for daily readings.
#[derive(Debug, Clone)]
pub struct ReadingRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl ReadingRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        ReadingRepository { pool, feed }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Reading>> {
        let row: Option<ReadingRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_READING))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Reading::try_from).transpose()
    }

    /// The reading for `date`, if any.
    ///
    /// Duplicate rows for one date are tolerated on read: the most recent
    /// wins and a consistency warning is logged.
    pub async fn find_by_date(&self, date: NaiveDate) -> DbResult<Option<Reading>> {
        let rows: Vec<ReadingRow> =
            sqlx::query_as(&format!("{} WHERE date = ?1", SELECT_READING))
                .bind(date)
                .fetch_all(&self.pool)
                .await?;

        let readings = into_readings(rows)?;
        Ok(select_reading_for_date(&readings, date).cloned())
    }

    /// All readings, newest date first.
    pub async fn list(&self) -> DbResult<Vec<Reading>> {
        let rows: Vec<ReadingRow> = sqlx::query_as(&format!(
            "{} ORDER BY date DESC, updated_at DESC",
            SELECT_READING
        ))
        .fetch_all(&self.pool)
        .await?;

        into_readings(rows)
    }

    /// Inserts or replaces the reading for `reading.date`.
    ///
    /// ## Returns
    /// The stored record. When a reading for that date already existed, its
    /// `id` and `created_at` are kept.
    pub async fn upsert(&self, reading: &Reading) -> DbResult<Reading> {
        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let stored = Self::upsert_in(&mut batch, reading).await?;
        batch.commit().await?;
        Ok(stored)
    }

    /// Writes first, so a concurrent save of the same date waits on the
    /// write lock (`busy_timeout`) instead of failing a read-to-write upgrade.
    pub async fn upsert_in(batch: &mut WriteBatch, reading: &Reading) -> DbResult<Reading> {
        let pumps = serde_json::to_string(&reading.pumps)?;

        let (id, created_at): (String, DateTime<Utc>) = sqlx::query_as(
            r#"
            INSERT INTO readings (
                id, date, pumps,
                petrol_price, diesel_price,
                total_petrol, total_diesel, total_usage, total_revenue,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(date) DO UPDATE SET
                pumps = excluded.pumps,
                petrol_price = excluded.petrol_price,
                diesel_price = excluded.diesel_price,
                total_petrol = excluded.total_petrol,
                total_diesel = excluded.total_diesel,
                total_usage = excluded.total_usage,
                total_revenue = excluded.total_revenue,
                updated_at = excluded.updated_at
            RETURNING id, created_at
            "#,
        )
        .bind(&reading.id)
        .bind(reading.date)
        .bind(&pumps)
        .bind(reading.petrol_price.paise())
        .bind(reading.diesel_price.paise())
        .bind(reading.total_petrol.millilitres())
        .bind(reading.total_diesel.millilitres())
        .bind(reading.total_usage.millilitres())
        .bind(reading.total_revenue.paise())
        .bind(reading.created_at)
        .bind(reading.updated_at)
        .fetch_one(batch.conn())
        .await?;

        if id == reading.id {
            debug!(id = %id, date = %reading.date, "Inserted reading");
        } else {
            debug!(id = %id, date = %reading.date, "Replaced reading");
        }

        batch.touch(Collection::Readings);
        Ok(Reading {
            id,
            created_at,
            ..reading.clone()
        })
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting reading");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let result = sqlx::query("DELETE FROM readings WHERE id = ?1")
            .bind(id)
            .execute(batch.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Reading", id));
        }

        batch.touch(Collection::Readings);
        batch.commit().await
    }

    /// Live list of all readings, newest first.
    pub fn subscribe(&self) -> Subscription<Reading> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Readings, move || {
            let repo = repo.clone();
            async move { repo.list().await }
        })
    }

    /// Live view of one date: an empty set or exactly one reading.
    pub fn subscribe_for_date(&self, date: NaiveDate) -> Subscription<Reading> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Readings, move || {
            let repo = repo.clone();
            async move { Ok(repo.find_by_date(date).await?.into_iter().collect()) }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::generate_id;
    use pumpdesk_core::ledger::build_reading;
    use pumpdesk_core::{default_pumps, FuelPrices, PumpEntry, ReadingDraft};
    use tokio::task::JoinSet;

    fn draft(date: NaiveDate, closing_litres: i64) -> ReadingDraft {
        ReadingDraft {
            date,
            entries: vec![PumpEntry::new(
                1,
                Volume::from_litres(100),
                Volume::from_litres(closing_litres),
            )],
            prices: FuelPrices::new(Money::from_rupees(100), Money::from_rupees(90)),
        }
    }

    fn reading(date: NaiveDate, closing_litres: i64) -> Reading {
        let now = Utc::now();
        build_reading(generate_id(), &draft(date, closing_litres), &default_pumps(), now, now)
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.readings();
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let first = repo.upsert(&reading(day, 150)).await.unwrap();
        let second = repo.upsert(&reading(day, 170)).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.created_at, second.created_at);

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_petrol, Volume::from_litres(70));
        assert_eq!(all[0].pumps.len(), 1);
    }

    #[tokio::test]
    async fn test_find_by_date_and_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.readings();
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();

        assert!(repo.find_by_date(day).await.unwrap().is_none());
        let stored = repo.upsert(&reading(day, 150)).await.unwrap();
        assert_eq!(
            repo.find_by_date(day).await.unwrap().unwrap().total_revenue,
            Money::from_rupees(5_000)
        );

        repo.delete(&stored.id).await.unwrap();
        assert!(repo.get_by_id(&stored.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&stored.id).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_subscription_sees_new_reading() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.readings();
        let day = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();

        let mut sub = repo.subscribe_for_date(day);
        assert!(sub.next().await.unwrap().unwrap().is_empty());

        repo.upsert(&reading(day, 120)).await.unwrap();
        let pushed = sub.next().await.unwrap().unwrap();
        assert_eq!(pushed.len(), 1);
        assert_eq!(pushed[0].total_usage, Volume::from_litres(20));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_keep_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(DbConfig::new(dir.path().join("pumpdesk.db")))
            .await
            .unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();

        let mut writers = JoinSet::new();
        for closing in 110..118 {
            let repo = db.readings();
            writers.spawn(async move { repo.upsert(&reading(day, closing)).await });
        }

        let mut ids = Vec::new();
        while let Some(joined) = writers.join_next().await {
            ids.push(joined.unwrap().unwrap().id);
        }
        ids.dedup();
        assert_eq!(ids.len(), 1);

        let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM readings WHERE date = ?1")
            .bind(day)
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(rows, 1);
    }

    #[tokio::test]
    async fn test_store_rejects_a_second_row_for_a_date() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        db.readings().upsert(&reading(day, 120)).await.unwrap();

        let err = sqlx::query(
            "INSERT INTO readings (id, date, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(generate_id())
        .bind(day)
        .bind(Utc::now())
        .execute(db.pool())
        .await
        .map_err(DbError::from)
        .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
