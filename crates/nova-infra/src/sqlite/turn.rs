//! SQLite turn repository implementation.
//!
//! Implements `TurnRepository` from `nova-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, reader for counts
//! and listings, writer for appends and deletes.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use nova_core::chat::repository::TurnRepository;
use nova_types::chat::{ChatTurn, MessageRole, SessionSummary};
use nova_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `TurnRepository`.
pub struct SqliteTurnRepository {
    pool: DatabasePool,
}

impl SqliteTurnRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatTurnRow {
    id: String,
    session_id: String,
    user_id: String,
    role: String,
    content: String,
    created_at: String,
}

impl ChatTurnRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_turn(self) -> Result<ChatTurn, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid turn id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ChatTurn {
            id,
            session_id: self.session_id,
            user_id,
            role,
            content: self.content,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// TurnRepository implementation
// ---------------------------------------------------------------------------

impl TurnRepository for SqliteTurnRepository {
    async fn save_turn(&self, turn: &ChatTurn) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_turns (id, session_id, user_id, role, content, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(turn.id.to_string())
        .bind(&turn.session_id)
        .bind(turn.user_id.to_string())
        .bind(turn.role.to_string())
        .bind(&turn.content)
        .bind(format_datetime(&turn.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_session_turns(
        &self,
        user_id: &Uuid,
        session_id: &str,
    ) -> Result<Vec<ChatTurn>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_turns WHERE user_id = ? AND session_id = ? ORDER BY created_at ASC",
        )
        .bind(user_id.to_string())
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut turns = Vec::with_capacity(rows.len());
        for row in &rows {
            let turn_row =
                ChatTurnRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            turns.push(turn_row.into_turn()?);
        }

        Ok(turns)
    }

    async fn list_recent_sessions(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<SessionSummary>, RepositoryError> {
        // SQLite's bare-column-with-MAX semantics: `content` comes from
        // the row holding MAX(created_at) within each group.
        let rows = sqlx::query(
            r#"SELECT session_id, content AS last_content, MAX(created_at) AS last_at
               FROM chat_turns
               WHERE user_id = ?
               GROUP BY session_id
               ORDER BY last_at DESC
               LIMIT ?"#,
        )
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut summaries = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_id: String = row
                .try_get("session_id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let last_content: String = row
                .try_get("last_content")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            let last_at: String = row
                .try_get("last_at")
                .map_err(|e| RepositoryError::Query(e.to_string()))?;
            summaries.push(SessionSummary {
                session_id,
                last_content,
                last_at: parse_datetime(&last_at)?,
            });
        }

        Ok(summaries)
    }

    async fn delete_session(
        &self,
        user_id: &Uuid,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM chat_turns WHERE user_id = ? AND session_id = ?")
            .bind(user_id.to_string())
            .bind(session_id)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn count_user_turns_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as cnt FROM chat_turns WHERE user_id = ? AND role = 'user' AND created_at >= ?",
        )
        .bind(user_id.to_string())
        .bind(format_datetime(&since))
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u32)
    }

    async fn count_user_turns(&self, user_id: &Uuid) -> Result<u64, RepositoryError> {
        let row = sqlx::query(
            "SELECT COUNT(*) as cnt FROM chat_turns WHERE user_id = ? AND role = 'user'",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(count as u64)
    }
}
