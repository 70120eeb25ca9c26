//! Consecutive-day streak derivation.
//!
//! Pure function of (previous streak, previous last-activity, now); the
//! relay applies the result to the profile after each completed exchange.
//! Calendar days are UTC.

use chrono::{DateTime, Utc};

/// The streak state to write back after an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreakUpdate {
    pub streak: u32,
    pub last_active_at: DateTime<Utc>,
}

/// Advance the streak for an exchange completed at `now`.
///
/// - first ever activity: streak starts at 1
/// - previous activity yesterday: streak + 1
/// - previous activity earlier today: unchanged
/// - previous activity before yesterday: reset to 1
/// - previous activity in the future (clock skew): treated as already
///   active today, unchanged
///
/// `last_active_at` always advances to `now`.
pub fn update_on_activity(
    streak: u32,
    last_active_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> StreakUpdate {
    let streak = match last_active_at {
        None => 1,
        Some(prev) => {
            let gap_days = now
                .date_naive()
                .signed_duration_since(prev.date_naive())
                .num_days();
            match gap_days {
                1 => streak.saturating_add(1),
                g if g <= 0 => streak.max(1),
                _ => 1,
            }
        }
    };

    StreakUpdate {
        streak,
        last_active_at: now,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn test_first_activity_starts_streak() {
        let now = at(2025, 6, 10, 14, 0);
        let update = update_on_activity(0, None, now);
        assert_eq!(update.streak, 1);
        assert_eq!(update.last_active_at, now);
    }

    #[test]
    fn test_consecutive_day_increments_across_midnight() {
        // Active yesterday at 23:00, again today at 01:00.
        let prev = at(2025, 6, 9, 23, 0);
        let now = at(2025, 6, 10, 1, 0);
        let update = update_on_activity(3, Some(prev), now);
        assert_eq!(update.streak, 4);
    }

    #[test]
    fn test_same_day_revisit_is_idempotent() {
        let prev = at(2025, 6, 10, 8, 0);
        let now = at(2025, 6, 10, 22, 30);
        let update = update_on_activity(2, Some(prev), now);
        assert_eq!(update.streak, 2);
        assert_eq!(update.last_active_at, now);
    }

    #[test]
    fn test_stale_activity_resets() {
        let prev = at(2025, 6, 7, 12, 0);
        let now = at(2025, 6, 10, 12, 0);
        let update = update_on_activity(5, Some(prev), now);
        assert_eq!(update.streak, 1);
    }

    #[test]
    fn test_future_timestamp_treated_as_active_today() {
        let prev = at(2025, 6, 11, 1, 0);
        let now = at(2025, 6, 10, 12, 0);
        let update = update_on_activity(3, Some(prev), now);
        assert_eq!(update.streak, 3);
        assert_eq!(update.last_active_at, now);
    }

    #[test]
    fn test_same_day_with_zero_streak_floors_at_one() {
        // A profile that somehow recorded activity without a streak still
        // reports at least 1 once it has been active today.
        let prev = at(2025, 6, 10, 8, 0);
        let now = at(2025, 6, 10, 9, 0);
        let update = update_on_activity(0, Some(prev), now);
        assert_eq!(update.streak, 1);
    }
}
