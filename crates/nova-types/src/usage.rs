//! Usage record and quota window types for Nova.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-user, per-day usage counters.
///
/// `day` is the UTC midnight of the calendar day the exchange completed.
/// One record per (user, day), created lazily on the first completed
/// exchange; `query_count` never decreases.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub user_id: Uuid,
    pub day: DateTime<Utc>,
    pub query_count: u32,
    /// Carried for schema compatibility with the image feature; the chat
    /// relay never increments it.
    pub image_count: u32,
}

/// Which quota window a submission was rejected against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuotaScope {
    Hourly,
    Daily,
}

impl fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuotaScope::Hourly => write!(f, "hourly"),
            QuotaScope::Daily => write!(f, "daily"),
        }
    }
}

/// Counts observed when a submission was admitted, before it was counted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UsageSnapshot {
    pub hourly_used: u32,
    pub daily_used: u32,
}

/// UTC midnight of the calendar day containing `now`.
pub fn utc_day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
