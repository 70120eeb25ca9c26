//! Badge unlock checks.
//!
//! Decoupled from the relay's main path: callers invoke it after an
//! exchange completes (or whenever). Idempotent -- a badge already held is
//! never re-awarded, and the set only ever grows.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use nova_types::error::RepositoryError;
use nova_types::llm::{CompletionRequest, Message, MessageRole};

use crate::chat::repository::TurnRepository;
use crate::llm::provider::LlmProvider;
use crate::profile::repository::ProfileRepository;

/// Ascending (threshold, badge name) pairs over lifetime user-turn count.
pub const BADGE_THRESHOLDS: &[(u64, &str)] = &[
    (1, "First Chat"),
    (10, "Curious Mind"),
    (25, "Regular Chatter"),
    (50, "Conversation Pro"),
    (100, "Chat Master"),
];

/// Errors from the badge check.
#[derive(Debug, Error)]
pub enum BadgeError {
    #[error("user not found")]
    UnknownUser,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of one badge check.
#[derive(Debug, Clone)]
pub struct BadgeOutcome {
    /// Badges unlocked by this check, in threshold order.
    pub new_badges: Vec<String>,
    /// The full set after the check.
    pub all_badges: Vec<String>,
    /// Model-generated celebration for the newest badge, when one
    /// unlocked and the gateway cooperated.
    pub celebration: Option<String>,
}

/// Checks lifetime turn counts against the badge thresholds.
pub struct BadgeChecker<T, P, L> {
    turns: Arc<T>,
    profiles: Arc<P>,
    provider: Arc<L>,
    model: String,
}

impl<T, P, L> BadgeChecker<T, P, L>
where
    T: TurnRepository,
    P: ProfileRepository,
    L: LlmProvider,
{
    pub fn new(turns: Arc<T>, profiles: Arc<P>, provider: Arc<L>, model: String) -> Self {
        Self {
            turns,
            profiles,
            provider,
            model,
        }
    }

    /// Award every badge whose threshold is met and not already held.
    ///
    /// Persists the union of old and new badges; returns only the newly
    /// unlocked names. Safe to call repeatedly.
    pub async fn check(&self, user_id: &Uuid) -> Result<BadgeOutcome, BadgeError> {
        let profile = self
            .profiles
            .get(user_id)
            .await?
            .ok_or(BadgeError::UnknownUser)?;

        let total = self.turns.count_user_turns(user_id).await?;

        let new_badges: Vec<String> = BADGE_THRESHOLDS
            .iter()
            .filter(|(threshold, name)| total >= *threshold && !profile.has_badge(name))
            .map(|(_, name)| (*name).to_string())
            .collect();

        if new_badges.is_empty() {
            return Ok(BadgeOutcome {
                new_badges,
                all_badges: profile.badges,
                celebration: None,
            });
        }

        let mut all_badges = profile.badges;
        all_badges.extend(new_badges.iter().cloned());
        self.profiles.set_badges(user_id, &all_badges).await?;

        let newest = new_badges.last().map(String::as_str).unwrap_or_default();
        let celebration = self.celebrate(newest, total).await;

        Ok(BadgeOutcome {
            new_badges,
            all_badges,
            celebration,
        })
    }

    /// Ask the gateway for a short celebration line. Failure here is
    /// non-fatal; the unlock already happened.
    async fn celebrate(&self, badge: &str, total: u64) -> Option<String> {
        let request = CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message {
                role: MessageRole::User,
                content: format!(
                    "Write a short, enthusiastic message (1-2 sentences) celebrating \
                     that the user earned the \"{badge}\" badge for reaching {total} \
                     chat messages."
                ),
            }],
            system: None,
            max_tokens: 256,
            temperature: None,
            stream: false,
        };

        match self.provider.complete(&request).await {
            Ok(response) => Some(response.content),
            Err(e) => {
                warn!(badge, error = %e, "celebration message generation failed");
                None
            }
        }
    }
}
