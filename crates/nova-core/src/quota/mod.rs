//! Usage ledger: quota windows and the per-day usage counters.
//!
//! Two fixed policy windows cap how many exchanges a user may start:
//! a rolling hour and the current UTC calendar day. Both are counted
//! from user-role turns in the message store, so the ledger consults the
//! [`TurnRepository`] for admission and the [`UsageRepository`] only for
//! the per-day display counters.

pub mod repository;

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

use nova_types::error::RepositoryError;
use nova_types::usage::{utc_day_start, QuotaScope, UsageRecord, UsageSnapshot};

use crate::chat::repository::TurnRepository;
use repository::UsageRepository;

/// Maximum user turns per rolling hour.
pub const HOURLY_LIMIT: u32 = 50;

/// Maximum user turns per UTC calendar day.
pub const DAILY_LIMIT: u32 = 100;

/// Errors from quota admission.
#[derive(Debug, Error)]
pub enum QuotaError {
    #[error("{scope} limit reached ({limit} queries)")]
    Exceeded { scope: QuotaScope, limit: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Answers "is this user within quota" and keeps the per-day counters.
pub struct UsageLedger<T, U> {
    turns: Arc<T>,
    usage: Arc<U>,
}

impl<T, U> Clone for UsageLedger<T, U> {
    fn clone(&self) -> Self {
        Self {
            turns: Arc::clone(&self.turns),
            usage: Arc::clone(&self.usage),
        }
    }
}

impl<T: TurnRepository, U: UsageRepository> UsageLedger<T, U> {
    pub fn new(turns: Arc<T>, usage: Arc<U>) -> Self {
        Self { turns, usage }
    }

    /// Admission check for a new submission.
    ///
    /// Thresholds are evaluated on usage up to but not including the
    /// current request: a count already at the limit rejects. The hourly
    /// window is checked first, so a user over both limits sees the
    /// hourly error.
    pub async fn check(
        &self,
        user_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<UsageSnapshot, QuotaError> {
        let hourly_used = self
            .turns
            .count_user_turns_since(user_id, now - Duration::hours(1))
            .await?;
        if hourly_used >= HOURLY_LIMIT {
            return Err(QuotaError::Exceeded {
                scope: QuotaScope::Hourly,
                limit: HOURLY_LIMIT,
            });
        }

        let daily_used = self
            .turns
            .count_user_turns_since(user_id, utc_day_start(now))
            .await?;
        if daily_used >= DAILY_LIMIT {
            return Err(QuotaError::Exceeded {
                scope: QuotaScope::Daily,
                limit: DAILY_LIMIT,
            });
        }

        Ok(UsageSnapshot {
            hourly_used,
            daily_used,
        })
    }

    /// Count a completed exchange against today's usage record.
    ///
    /// Called once per exchange, after the assistant turn has completed.
    pub async fn record_exchange(
        &self,
        user_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        self.usage
            .increment_query_count(user_id, utc_day_start(now))
            .await
    }

    /// Today's usage record, if any exchange completed today.
    pub async fn today_record(
        &self,
        user_id: &Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, RepositoryError> {
        self.usage.get_record(user_id, utc_day_start(now)).await
    }
}
