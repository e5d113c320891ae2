//! # Fuel Intake Repository
//!
//! Tanker deliveries. Append-only: insert and delete, never update.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::{FuelIntake, FuelType, Volume};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection, Subscription};

const SELECT_INTAKE: &str = r#"
    SELECT id, date, fuel_type, amount, invoice_ref, note, created_by, created_at
    FROM fuel_intakes
"#;

#[derive(Debug, sqlx::FromRow)]
struct IntakeRow {
    id: String,
    date: NaiveDate,
    fuel_type: FuelType,
    amount: i64,
    invoice_ref: String,
    note: Option<String>,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl From<IntakeRow> for FuelIntake {
    fn from(row: IntakeRow) -> Self {
        FuelIntake {
            id: row.id,
            date: row.date,
            fuel_type: row.fuel_type,
            amount: Volume::from_millilitres(row.amount),
            invoice_ref: row.invoice_ref,
            note: row.note,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IntakeRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl IntakeRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        IntakeRepository { pool, feed }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<FuelIntake>> {
        let row: Option<IntakeRow> = sqlx::query_as(&format!("{} WHERE id = ?1", SELECT_INTAKE))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(FuelIntake::from))
    }

    /// All intakes, newest delivery first.
    pub async fn list(&self) -> DbResult<Vec<FuelIntake>> {
        let rows: Vec<IntakeRow> = sqlx::query_as(&format!(
            "{} ORDER BY date DESC, created_at DESC",
            SELECT_INTAKE
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(FuelIntake::from).collect())
    }

    pub async fn insert(&self, intake: &FuelIntake) -> DbResult<()> {
        debug!(
            id = %intake.id,
            fuel_type = %intake.fuel_type,
            amount = %intake.amount,
            "Recording fuel intake"
        );

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        sqlx::query(
            r#"
            INSERT INTO fuel_intakes (
                id, date, fuel_type, amount, invoice_ref, note, created_by, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&intake.id)
        .bind(intake.date)
        .bind(intake.fuel_type)
        .bind(intake.amount.millilitres())
        .bind(&intake.invoice_ref)
        .bind(&intake.note)
        .bind(&intake.created_by)
        .bind(intake.created_at)
        .execute(batch.conn())
        .await?;

        batch.touch(Collection::FuelIntakes);
        batch.commit().await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting fuel intake");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        let result = sqlx::query("DELETE FROM fuel_intakes WHERE id = ?1")
            .bind(id)
            .execute(batch.conn())
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("FuelIntake", id));
        }

        batch.touch(Collection::FuelIntakes);
        batch.commit().await
    }

    pub fn subscribe(&self) -> Subscription<FuelIntake> {
        let repo = self.clone();
        self.feed.subscribe(Collection::FuelIntakes, move || {
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

    fn intake(fuel_type: FuelType, litres: i64, day: u32) -> FuelIntake {
        FuelIntake {
            id: generate_id(),
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            fuel_type,
            amount: Volume::from_litres(litres),
            invoice_ref: format!("INV-{}", day),
            note: None,
            created_by: "Owner".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_list_delete() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.intakes();

        let older = intake(FuelType::Petrol, 10_000, 1);
        let newer = intake(FuelType::Diesel, 8_000, 5);
        repo.insert(&older).await.unwrap();
        repo.insert(&newer).await.unwrap();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, newer.id);
        assert_eq!(all[1].fuel_type, FuelType::Petrol);
        assert_eq!(all[1].amount, Volume::from_litres(10_000));

        repo.delete(&older.id).await.unwrap();
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_by_schema() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bad = intake(FuelType::Petrol, 0, 1);
        assert!(db.intakes().insert(&bad).await.is_err());
        assert!(db.intakes().list().await.unwrap().is_empty());
    }
}
