//! # User Repository
//!
//! Role profiles for the local identity provider. Email is unique
//! (case-insensitive).

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use pumpdesk_core::{Role, UserProfile};

use crate::batch::WriteBatch;
use crate::error::{DbError, DbResult};
use crate::feed::{ChangeFeed, Collection};

const SELECT_USER: &str = r#"
    SELECT uid, email, name, role, password_hash, created_by, created_at
    FROM users
"#;

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    uid: String,
    email: String,
    name: String,
    role: Role,
    password_hash: String,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for UserProfile {
    fn from(row: UserRow) -> Self {
        UserProfile {
            uid: row.uid,
            email: row.email,
            name: row.name,
            role: row.role,
            password_hash: row.password_hash,
            created_by: row.created_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
    feed: ChangeFeed,
}

impl UserRepository {
    pub fn new(pool: SqlitePool, feed: ChangeFeed) -> Self {
        UserRepository { pool, feed }
    }

    pub async fn get_by_uid(&self, uid: &str) -> DbResult<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE uid = ?1", SELECT_USER))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserProfile::from))
    }

    pub async fn find_by_email(&self, email: &str) -> DbResult<Option<UserProfile>> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{} WHERE email = ?1", SELECT_USER))
            .bind(email.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(UserProfile::from))
    }

    pub async fn list(&self) -> DbResult<Vec<UserProfile>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("{} ORDER BY created_at", SELECT_USER))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(UserProfile::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Stores a new profile. Fails with `UniqueViolation` when the email is
    /// already registered.
    pub async fn insert(&self, user: &UserProfile) -> DbResult<()> {
        info!(uid = %user.uid, email = %user.email, role = %user.role, "Creating user profile");

        let mut batch = WriteBatch::begin(&self.pool, &self.feed).await?;
        sqlx::query(
            r#"
            INSERT INTO users (uid, email, name, role, password_hash, created_by, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&user.uid)
        .bind(user.email.trim())
        .bind(&user.name)
        .bind(user.role)
        .bind(&user.password_hash)
        .bind(&user.created_by)
        .bind(user.created_at)
        .execute(batch.conn())
        .await
        .map_err(|err| match DbError::from(err) {
            DbError::UniqueViolation { .. } => DbError::duplicate("email", user.email.trim()),
            other => other,
        })?;

        batch.touch(Collection::Users);
        batch.commit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn profile(uid: &str, email: &str, role: Role) -> UserProfile {
        UserProfile {
            uid: uid.to_string(),
            email: email.to_string(),
            name: uid.to_string(),
            role,
            password_hash: "$argon2id$stub".to_string(),
            created_by: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_email_is_unique_ignoring_case() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();

        repo.insert(&profile("u1", "owner@station.in", Role::Admin))
            .await
            .unwrap();
        let err = repo
            .insert(&profile("u2", "OWNER@station.in", Role::Manager))
            .await
            .unwrap_err();

        assert!(matches!(err, DbError::UniqueViolation { ref field, .. } if field == "email"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_lookup_by_email_and_uid() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.users();
        repo.insert(&profile("u7", "ravi@station.in", Role::Employee))
            .await
            .unwrap();

        let by_email = repo.find_by_email("Ravi@Station.in").await.unwrap().unwrap();
        assert_eq!(by_email.uid, "u7");
        assert_eq!(by_email.role, Role::Employee);
        assert!(repo.get_by_uid("missing").await.unwrap().is_none());
    }
}
