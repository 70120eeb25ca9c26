//! UsageRepository trait definition.

use chrono::{DateTime, Utc};
use nova_types::error::RepositoryError;
use nova_types::usage::UsageRecord;
use uuid::Uuid;

/// Repository trait for the per-user, per-day usage counters.
///
/// `day` arguments are always UTC midnights (see
/// [`nova_types::usage::utc_day_start`]).
pub trait UsageRepository: Send + Sync {
    /// Get the record for one user and day, if it exists.
    fn get_record(
        &self,
        user_id: &Uuid,
        day: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<Option<UsageRecord>, RepositoryError>> + Send;

    /// Add one completed exchange to a day's query count, creating the
    /// record lazily on the first exchange of the day.
    fn increment_query_count(
        &self,
        user_id: &Uuid,
        day: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
