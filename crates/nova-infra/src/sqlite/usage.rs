//! SQLite usage repository implementation.
//!
//! One row per (user, UTC day). `increment_query_count` is a single
//! upsert so the lazily-created first row and subsequent increments go
//! through the same statement.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use nova_core::quota::repository::UsageRepository;
use nova_types::error::RepositoryError;
use nova_types::usage::UsageRecord;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `UsageRepository`.
pub struct SqliteUsageRepository {
    pool: DatabasePool,
}

impl SqliteUsageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl UsageRepository for SqliteUsageRepository {
    async fn get_record(
        &self,
        user_id: &Uuid,
        day: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM usage_records WHERE user_id = ? AND day = ?")
            .bind(user_id.to_string())
            .bind(day.to_rfc3339())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let day_str: String = row
                    .try_get("day")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let query_count: i64 = row
                    .try_get("query_count")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                let image_count: i64 = row
                    .try_get("image_count")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;

                Ok(Some(UsageRecord {
                    user_id: *user_id,
                    day: parse_datetime(&day_str)?,
                    query_count: query_count as u32,
                    image_count: image_count as u32,
                }))
            }
            None => Ok(None),
        }
    }

    async fn increment_query_count(
        &self,
        user_id: &Uuid,
        day: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO usage_records (user_id, day, query_count, image_count)
               VALUES (?, ?, 1, 0)
               ON CONFLICT(user_id, day) DO UPDATE SET query_count = query_count + 1"#,
        )
        .bind(user_id.to_string())
        .bind(day.to_rfc3339())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }
}
