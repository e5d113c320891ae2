//! # Attendance Repository
//!
//! One row per `(date, staff_id)`. Re-marking overwrites; a missing row
//! means "unmarked".

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::debug;

use pumpdesk_core::{AttendanceMark, AttendanceStatus};

use crate::batch::WriteBatch;
use crate::error::DbResult;
use crate::feed::{ChangeFeed, Collection, Subscription};

#[derive(Debug, sqlx::FromRow)]
struct AttendanceRow {
    date: NaiveDate,
    staff_id: String,
    status: AttendanceStatus,
    marked_by: String,
    marked_at: DateTime<Utc>,
}

impl From<AttendanceRow> for AttendanceMark {
    fn from(row: AttendanceRow) -> Self {
        AttendanceMark {
            date: row.date,
            staff_id: row.staff_id,
            status: row.status,
            marked_by: row.marked_by,
            marked_at: row.marked_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttendanceRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl AttendanceRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        AttendanceRepository { pool, feed }
    }

    pub async fn list_for_date(&self, date: NaiveDate) -> DbResult<Vec<AttendanceMark>> {
        let rows: Vec<AttendanceRow> = sqlx::query_as(
            r#"
            SELECT date, staff_id, status, marked_by, marked_at
            FROM attendance
            WHERE date = ?1
            ORDER BY staff_id
            "#,
        )
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AttendanceMark::from).collect())
    }

    pub async fn mark(&self, mark: &AttendanceMark) -> DbResult<()> {
        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        Self::mark_in(&mut batch, mark).await?;
        batch.commit().await
    }

    /// Marks every listed staff member with the same status in one commit.
    pub async fn mark_all(&self, marks: &[AttendanceMark]) -> DbResult<()> {
        if marks.is_empty() {
            return Ok(());
        }

        debug!(count = marks.len(), "Bulk attendance mark");
        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        for mark in marks {
            Self::mark_in(&mut batch, mark).await?;
        }
        batch.commit().await
    }

    async fn mark_in(batch: &mut WriteBatch, mark: &AttendanceMark) -> DbResult<()> {
        debug!(
            date = %mark.date,
            staff_id = %mark.staff_id,
            status = ?mark.status,
            "Marking attendance"
        );

        sqlx::query(
            r#"
            INSERT INTO attendance (date, staff_id, status, marked_by, marked_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(date, staff_id) DO UPDATE SET
                status = excluded.status,
                marked_by = excluded.marked_by,
                marked_at = excluded.marked_at
            "#,
        )
        .bind(mark.date)
        .bind(&mark.staff_id)
        .bind(mark.status)
        .bind(&mark.marked_by)
        .bind(mark.marked_at)
        .execute(batch.conn())
        .await?;

        batch.touch(Collection::Attendance);
        Ok(())
    }

    pub fn subscribe_for_date(&self, date: NaiveDate) -> Subscription<AttendanceMark> {
        let repo = self.clone();
        self.feed.subscribe(Collection::Attendance, move || {
            let repo = repo.clone();
            async move { repo.list_for_date(date).await }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn mark(staff_id: &str, status: AttendanceStatus) -> AttendanceMark {
        AttendanceMark {
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            staff_id: staff_id.to_string(),
            status,
            marked_by: "Asha".to_string(),
            marked_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_remark_overwrites() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.attendance();

        repo.mark(&mark("s1", AttendanceStatus::Absent)).await.unwrap();
        repo.mark(&mark("s1", AttendanceStatus::Present)).await.unwrap();

        let day = repo
            .list_for_date(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .await
            .unwrap();
        assert_eq!(day.len(), 1);
        assert_eq!(day[0].status, AttendanceStatus::Present);
    }

    #[tokio::test]
    async fn test_mark_all_and_other_dates() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.attendance();
        let marks: Vec<_> = ["s1", "s2", "s3"]
            .iter()
            .map(|id| mark(id, AttendanceStatus::Present))
            .collect();

        repo.mark_all(&marks).await.unwrap();

        let june_1 = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let june_2 = NaiveDate::from_ymd_opt(2024, 6, 2).unwrap();
        assert_eq!(repo.list_for_date(june_1).await.unwrap().len(), 3);
        assert!(repo.list_for_date(june_2).await.unwrap().is_empty());
    }
}
