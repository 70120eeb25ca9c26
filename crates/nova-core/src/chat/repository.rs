//! TurnRepository trait definition.
//!
//! The append-only message store: every chat turn lands here, and the
//! quota windows and badge thresholds are derived from counts over it.

use chrono::{DateTime, Utc};
use nova_types::chat::{ChatTurn, SessionSummary};
use nova_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for the append-only chat turn log.
///
/// Implementations live in nova-infra (e.g., `SqliteTurnRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait TurnRepository: Send + Sync {
    /// Append a turn to the log.
    fn save_turn(
        &self,
        turn: &ChatTurn,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a session's turns for one user, ordered by created_at ASC.
    ///
    /// The user predicate doubles as the ownership check: turns of other
    /// users' sessions are never returned.
    fn get_session_turns(
        &self,
        user_id: &Uuid,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<Vec<ChatTurn>, RepositoryError>> + Send;

    /// Per-session summaries (most recent turn's content and timestamp)
    /// for one user, most recent session first.
    fn list_recent_sessions(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<SessionSummary>, RepositoryError>> + Send;

    /// Delete all of a user's turns in a session. Returns how many turns
    /// were removed (0 when the session does not exist or is not theirs).
    fn delete_session(
        &self,
        user_id: &Uuid,
        session_id: &str,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// Count user-role turns with `created_at >= since`. Drives both the
    /// rolling hourly and the calendar-day quota windows.
    fn count_user_turns_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<u32, RepositoryError>> + Send;

    /// Lifetime count of user-role turns. Drives badge thresholds.
    fn count_user_turns(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;
}
