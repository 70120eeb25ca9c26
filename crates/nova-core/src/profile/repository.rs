//! ProfileRepository trait definition.

use chrono::{DateTime, Utc};
use nova_types::error::RepositoryError;
use nova_types::user::UserProfile;
use uuid::Uuid;

/// Repository trait for user profiles and their gamification state.
///
/// Implementations live in nova-infra (e.g., `SqliteProfileRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ProfileRepository: Send + Sync {
    /// Create a new user profile.
    fn create(
        &self,
        profile: &UserProfile,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Get a profile by user id.
    fn get(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<UserProfile>, RepositoryError>> + Send;

    /// Get a profile by email (used by user provisioning).
    fn get_by_email(
        &self,
        email: &str,
    ) -> impl std::future::Future<Output = Result<Option<UserProfile>, RepositoryError>> + Send;

    /// Write the streak counter and last-activity timestamp.
    fn update_activity(
        &self,
        user_id: &Uuid,
        streak: u32,
        last_active_at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Replace the badge set. Callers only ever pass a superset of the
    /// current set; a badge is never removed.
    fn set_badges(
        &self,
        user_id: &Uuid,
        badges: &[String],
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
