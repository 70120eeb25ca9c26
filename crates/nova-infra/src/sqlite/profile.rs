//! SQLite profile repository implementation.
//!
//! The `users` table doubles as the gamification profile. Badges are
//! stored as a JSON array in a TEXT column.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use nova_core::profile::repository::ProfileRepository;
use nova_types::error::RepositoryError;
use nova_types::user::UserProfile;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ProfileRepository`.
pub struct SqliteProfileRepository {
    pool: DatabasePool,
}

impl SqliteProfileRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row type for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct UserRow {
    id: String,
    email: String,
    streak: i64,
    last_active_at: Option<String>,
    badges: String,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            streak: row.try_get("streak")?,
            last_active_at: row.try_get("last_active_at")?,
            badges: row.try_get("badges")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_profile(self) -> Result<UserProfile, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        let last_active_at = self
            .last_active_at
            .as_deref()
            .map(parse_datetime)
            .transpose()?;
        let created_at = parse_datetime(&self.created_at)?;
        let badges: Vec<String> = serde_json::from_str(&self.badges)
            .map_err(|e| RepositoryError::Query(format!("invalid badges JSON: {e}")))?;

        Ok(UserProfile {
            id,
            email: self.email,
            streak: self.streak as u32,
            last_active_at,
            badges,
            created_at,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// ProfileRepository implementation
// ---------------------------------------------------------------------------

impl ProfileRepository for SqliteProfileRepository {
    async fn create(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        let badges = serde_json::to_string(&profile.badges)
            .map_err(|e| RepositoryError::Query(format!("badges serialization: {e}")))?;

        sqlx::query(
            r#"INSERT INTO users (id, email, streak, last_active_at, badges, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(profile.id.to_string())
        .bind(&profile.email)
        .bind(profile.streak as i64)
        .bind(profile.last_active_at.as_ref().map(format_datetime))
        .bind(badges)
        .bind(format_datetime(&profile.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE") {
                RepositoryError::Conflict(format!("email '{}' already registered", profile.email))
            } else {
                RepositoryError::Query(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get(&self, user_id: &Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_profile()?))
            }
            None => Ok(None),
        }
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserProfile>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_profile()?))
            }
            None => Ok(None),
        }
    }

    async fn update_activity(
        &self,
        user_id: &Uuid,
        streak: u32,
        last_active_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET streak = ?, last_active_at = ? WHERE id = ?")
            .bind(streak as i64)
            .bind(format_datetime(&last_active_at))
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn set_badges(&self, user_id: &Uuid, badges: &[String]) -> Result<(), RepositoryError> {
        let badges = serde_json::to_string(badges)
            .map_err(|e| RepositoryError::Query(format!("badges serialization: {e}")))?;

        let result = sqlx::query("UPDATE users SET badges = ? WHERE id = ?")
            .bind(badges)
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }
}
