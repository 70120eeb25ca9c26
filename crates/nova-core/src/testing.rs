//! In-memory repository fakes and a scripted provider for unit tests.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};

use chrono::{DateTime, Utc};
use futures_util::Stream;
use tokio::sync::Mutex;
use uuid::Uuid;

use nova_types::chat::{ChatTurn, MessageRole, SessionSummary};
use nova_types::error::RepositoryError;
use nova_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, StopReason, StreamEvent, Usage,
};
use nova_types::usage::UsageRecord;
use nova_types::user::UserProfile;

use crate::chat::repository::TurnRepository;
use crate::llm::provider::LlmProvider;
use crate::profile::repository::ProfileRepository;
use crate::quota::repository::UsageRepository;

/// Build a turn with an explicit timestamp.
pub fn turn_at(
    user_id: Uuid,
    session_id: &str,
    role: MessageRole,
    created_at: DateTime<Utc>,
) -> ChatTurn {
    ChatTurn {
        id: Uuid::now_v7(),
        session_id: session_id.to_string(),
        user_id,
        role,
        content: format!("{role} turn"),
        created_at,
    }
}

// ---------------------------------------------------------------------------
// MemoryTurnRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryTurnRepository {
    turns: Mutex<Vec<ChatTurn>>,
}

impl MemoryTurnRepository {
    /// Insert a pre-built turn directly (bypassing `save_turn`).
    pub async fn push(&self, turn: ChatTurn) {
        self.turns.lock().await.push(turn);
    }

    pub async fn all(&self) -> Vec<ChatTurn> {
        self.turns.lock().await.clone()
    }
}

impl TurnRepository for MemoryTurnRepository {
    async fn save_turn(&self, turn: &ChatTurn) -> Result<(), RepositoryError> {
        self.turns.lock().await.push(turn.clone());
        Ok(())
    }

    async fn get_session_turns(
        &self,
        user_id: &Uuid,
        session_id: &str,
    ) -> Result<Vec<ChatTurn>, RepositoryError> {
        let mut turns: Vec<ChatTurn> = self
            .turns
            .lock()
            .await
            .iter()
            .filter(|t| t.user_id == *user_id && t.session_id == session_id)
            .cloned()
            .collect();
        turns.sort_by_key(|t| t.created_at);
        Ok(turns)
    }

    async fn list_recent_sessions(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<SessionSummary>, RepositoryError> {
        let turns = self.turns.lock().await;
        let mut latest: HashMap<String, &ChatTurn> = HashMap::new();
        for turn in turns.iter().filter(|t| t.user_id == *user_id) {
            let entry = latest.entry(turn.session_id.clone()).or_insert(turn);
            if turn.created_at > entry.created_at {
                *entry = turn;
            }
        }
        let mut summaries: Vec<SessionSummary> = latest
            .into_values()
            .map(|t| SessionSummary {
                session_id: t.session_id.clone(),
                last_content: t.content.clone(),
                last_at: t.created_at,
            })
            .collect();
        summaries.sort_by(|a, b| b.last_at.cmp(&a.last_at));
        summaries.truncate(limit as usize);
        Ok(summaries)
    }

    async fn delete_session(
        &self,
        user_id: &Uuid,
        session_id: &str,
    ) -> Result<u64, RepositoryError> {
        let mut turns = self.turns.lock().await;
        let before = turns.len();
        turns.retain(|t| !(t.user_id == *user_id && t.session_id == session_id));
        Ok((before - turns.len()) as u64)
    }

    async fn count_user_turns_since(
        &self,
        user_id: &Uuid,
        since: DateTime<Utc>,
    ) -> Result<u32, RepositoryError> {
        let count = self
            .turns
            .lock()
            .await
            .iter()
            .filter(|t| {
                t.user_id == *user_id && t.role == MessageRole::User && t.created_at >= since
            })
            .count();
        Ok(count as u32)
    }

    async fn count_user_turns(&self, user_id: &Uuid) -> Result<u64, RepositoryError> {
        let count = self
            .turns
            .lock()
            .await
            .iter()
            .filter(|t| t.user_id == *user_id && t.role == MessageRole::User)
            .count();
        Ok(count as u64)
    }
}

// ---------------------------------------------------------------------------
// MemoryProfileRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryProfileRepository {
    profiles: Mutex<HashMap<Uuid, UserProfile>>,
}

impl ProfileRepository for MemoryProfileRepository {
    async fn create(&self, profile: &UserProfile) -> Result<(), RepositoryError> {
        self.profiles
            .lock()
            .await
            .insert(profile.id, profile.clone());
        Ok(())
    }

    async fn get(&self, user_id: &Uuid) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self.profiles.lock().await.get(user_id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<UserProfile>, RepositoryError> {
        Ok(self
            .profiles
            .lock()
            .await
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn update_activity(
        &self,
        user_id: &Uuid,
        streak: u32,
        last_active_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.lock().await;
        let profile = profiles.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        profile.streak = streak;
        profile.last_active_at = Some(last_active_at);
        Ok(())
    }

    async fn set_badges(&self, user_id: &Uuid, badges: &[String]) -> Result<(), RepositoryError> {
        let mut profiles = self.profiles.lock().await;
        let profile = profiles.get_mut(user_id).ok_or(RepositoryError::NotFound)?;
        profile.badges = badges.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryUsageRepository
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryUsageRepository {
    records: Mutex<HashMap<(Uuid, DateTime<Utc>), UsageRecord>>,
}

impl UsageRepository for MemoryUsageRepository {
    async fn get_record(
        &self,
        user_id: &Uuid,
        day: DateTime<Utc>,
    ) -> Result<Option<UsageRecord>, RepositoryError> {
        Ok(self.records.lock().await.get(&(*user_id, day)).cloned())
    }

    async fn increment_query_count(
        &self,
        user_id: &Uuid,
        day: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let mut records = self.records.lock().await;
        records
            .entry((*user_id, day))
            .and_modify(|r| r.query_count += 1)
            .or_insert(UsageRecord {
                user_id: *user_id,
                day,
                query_count: 1,
                image_count: 0,
            });
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

/// A provider that replays a fixed list of text chunks, or fails.
pub struct ScriptedProvider {
    chunks: Vec<String>,
    fail_to_connect: bool,
    fail_mid_stream: bool,
    stream_calls: AtomicU32,
}

impl ScriptedProvider {
    pub fn with_chunks(chunks: Vec<&str>) -> Self {
        Self {
            chunks: chunks.into_iter().map(String::from).collect(),
            fail_to_connect: false,
            fail_mid_stream: false,
            stream_calls: AtomicU32::new(0),
        }
    }

    /// Every call fails before anything is produced.
    pub fn failing() -> Self {
        Self {
            fail_to_connect: true,
            ..Self::with_chunks(vec![])
        }
    }

    /// Produces the chunks, then errors instead of finishing cleanly.
    pub fn failing_mid_stream(chunks: Vec<&str>) -> Self {
        Self {
            fail_mid_stream: true,
            ..Self::with_chunks(chunks)
        }
    }

    /// How many times `stream` was invoked.
    pub fn stream_calls(&self) -> u32 {
        self.stream_calls.load(Ordering::SeqCst)
    }
}

impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        if self.fail_to_connect {
            return Err(LlmError::Provider {
                message: "scripted failure".to_string(),
            });
        }
        Ok(CompletionResponse {
            content: self.chunks.concat(),
            model: request.model.clone(),
            stop_reason: StopReason::EndTurn,
            usage: Usage::default(),
        })
    }

    fn stream(
        &self,
        _request: CompletionRequest,
    ) -> Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static>> {
        self.stream_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_to_connect {
            return Box::pin(futures_util::stream::iter(vec![Err(LlmError::Provider {
                message: "scripted connect failure".to_string(),
            })]));
        }

        let mut events: Vec<Result<StreamEvent, LlmError>> = vec![Ok(StreamEvent::Connected)];
        events.extend(
            self.chunks
                .iter()
                .map(|c| Ok(StreamEvent::TextDelta { text: c.clone() })),
        );
        if self.fail_mid_stream {
            events.push(Err(LlmError::Stream("scripted mid-stream failure".to_string())));
        } else {
            events.push(Ok(StreamEvent::MessageDelta {
                stop_reason: StopReason::EndTurn,
            }));
            events.push(Ok(StreamEvent::Done));
        }
        Box::pin(futures_util::stream::iter(events))
    }
}
