//! User profile type for Nova.
//!
//! The profile carries the gamification state: the consecutive-day streak,
//! the timestamp it was last advanced, and the set of unlocked badges.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered user and their gamification state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    /// Consecutive calendar days with at least one completed exchange.
    pub streak: u32,
    pub last_active_at: Option<DateTime<Utc>>,
    /// Unlocked badge names. Append-only; a badge is never removed.
    pub badges: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh profile: no streak, no activity, no badges.
    pub fn new(email: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            email,
            streak: 0,
            last_active_at: None,
            badges: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_badge(&self, name: &str) -> bool {
        self.badges.iter().any(|b| b == name)
    }
}
