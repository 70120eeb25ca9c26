//! Chat turn and session summary types for Nova.
//!
//! A "session" is nothing more than the set of turns sharing a session id;
//! there is no session entity. Turns are immutable once created and are
//! ordered by `created_at` ascending within a session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export MessageRole from the llm module (a turn's author and an LLM
// message's role are the same two-valued set).
pub use crate::llm::MessageRole;

/// One message in a chat exchange, authored by the end user or the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub id: Uuid,
    /// Opaque grouping key. Client-chosen or server-generated.
    pub session_id: String,
    pub user_id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatTurn {
    /// Build a new turn stamped with the current time.
    pub fn new(session_id: String, user_id: Uuid, role: MessageRole, content: String) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            user_id,
            role,
            content,
            created_at: Utc::now(),
        }
    }
}

/// Summary of one session for the sidebar listing: its most recent turn's
/// content and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub last_content: String,
    pub last_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Sidebar title: the most recent turn's text, truncated to at most
    /// `max_chars` characters (character boundary safe).
    pub fn title(&self, max_chars: usize) -> String {
        self.last_content.chars().take(max_chars).collect()
    }
}
