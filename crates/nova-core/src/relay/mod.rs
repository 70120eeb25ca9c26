//! The chat relay: quota check, turn persistence, model streaming, and
//! completion bookkeeping, sequenced for one inbound user turn.
//!
//! Order of operations per submission:
//! 1. validate input
//! 2. quota admission (no side effects on rejection)
//! 3. persist the user turn
//! 4. establish the gateway stream (user turn stays committed on failure)
//! 5. forward chunks as they arrive
//! 6. after the stream drains: persist the assistant turn, count the
//!    exchange, advance the streak -- failures here are logged, never
//!    surfaced, because the caller already has the answer.

use std::pin::Pin;
use std::sync::Arc;

use chrono::Utc;
use futures_util::{stream, Stream, StreamExt};
use tracing::{error, info, warn};
use uuid::Uuid;

use nova_types::chat::ChatTurn;
use nova_types::error::RepositoryError;
use nova_types::llm::{CompletionRequest, LlmError, Message, MessageRole, StreamEvent};
use nova_types::usage::QuotaScope;

use crate::chat::repository::TurnRepository;
use crate::llm::provider::LlmProvider;
use crate::profile::repository::ProfileRepository;
use crate::quota::repository::UsageRepository;
use crate::quota::{QuotaError, UsageLedger};
use crate::streak;

/// System instruction sent with every completion request.
const SYSTEM_PROMPT: &str = "You are a helpful assistant with a casual tone.";

/// Generation settings for relayed completions.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub model: String,
    pub temperature: f64,
    pub max_tokens: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            model: "gemini-2.0-flash".to_string(),
            temperature: 0.7,
            max_tokens: 4096,
        }
    }
}

/// One inbound user turn.
#[derive(Debug, Clone)]
pub struct SubmitTurn {
    /// Session to continue; a new one is generated when absent.
    pub session_id: Option<String>,
    /// The conversation so far, oldest first.
    pub prior_turns: Vec<Message>,
    /// The new user message.
    pub message: String,
}

/// Events forwarded to the transport while the exchange runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    /// A chunk of assistant text, in arrival order.
    Delta(String),
    /// The gateway failed mid-stream; no more deltas will follow.
    Error(String),
    /// The exchange is over (bookkeeping already attempted).
    Done,
}

pub type RelayStream = Pin<Box<dyn Stream<Item = RelayEvent> + Send + 'static>>;

/// An admitted exchange: the resolved session id plus the event stream.
pub struct RelayReply {
    pub session_id: String,
    pub events: RelayStream,
}

impl std::fmt::Debug for RelayReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayReply")
            .field("session_id", &self.session_id)
            .field("events", &"<stream>")
            .finish()
    }
}

/// Errors raised before anything has been streamed to the caller.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("{scope} limit reached ({limit} queries)")]
    QuotaExceeded { scope: QuotaScope, limit: u32 },

    #[error("gateway error: {0}")]
    Gateway(#[from] LlmError),

    #[error("persistence error: {0}")]
    Persistence(#[from] RepositoryError),
}

impl From<QuotaError> for RelayError {
    fn from(e: QuotaError) -> Self {
        match e {
            QuotaError::Exceeded { scope, limit } => RelayError::QuotaExceeded { scope, limit },
            QuotaError::Repository(e) => RelayError::Persistence(e),
        }
    }
}

/// Orchestrates one chat exchange end to end.
///
/// Generic over the repositories and the provider so the API layer can pin
/// it to the SQLite/Gemini implementations while tests use in-memory
/// fakes (nova-core never depends on nova-infra).
pub struct ChatRelay<T, P, U, L> {
    turns: Arc<T>,
    profiles: Arc<P>,
    ledger: UsageLedger<T, U>,
    provider: Arc<L>,
    config: RelayConfig,
}

impl<T, P, U, L> ChatRelay<T, P, U, L>
where
    T: TurnRepository + 'static,
    P: ProfileRepository + 'static,
    U: UsageRepository + 'static,
    L: LlmProvider + 'static,
{
    pub fn new(
        turns: Arc<T>,
        profiles: Arc<P>,
        usage: Arc<U>,
        provider: Arc<L>,
        config: RelayConfig,
    ) -> Self {
        let ledger = UsageLedger::new(Arc::clone(&turns), usage);
        Self {
            turns,
            profiles,
            ledger,
            provider,
            config,
        }
    }

    /// The usage ledger (shared with the profile/usage read endpoint).
    pub fn ledger(&self) -> &UsageLedger<T, U> {
        &self.ledger
    }

    /// Admit and run one exchange.
    ///
    /// Returns after the user turn is committed and the gateway stream is
    /// established; the returned stream then yields assistant text chunks
    /// and performs completion bookkeeping before its final `Done`.
    pub async fn submit(&self, user_id: Uuid, input: SubmitTurn) -> Result<RelayReply, RelayError> {
        let message = input.message.trim();
        if message.is_empty() {
            return Err(RelayError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        for (i, turn) in input.prior_turns.iter().enumerate() {
            if turn.content.trim().is_empty() {
                return Err(RelayError::InvalidInput(format!(
                    "prior turn {i} has empty content"
                )));
            }
        }

        let now = Utc::now();
        self.ledger.check(&user_id, now).await?;

        let session_id = input
            .session_id
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| Uuid::now_v7().to_string());

        // The user's turn must survive even if the model call fails or
        // the client disconnects mid-stream.
        let user_turn = ChatTurn::new(
            session_id.clone(),
            user_id,
            MessageRole::User,
            message.to_string(),
        );
        self.turns.save_turn(&user_turn).await?;

        let mut messages = input.prior_turns;
        messages.push(Message {
            role: MessageRole::User,
            content: message.to_string(),
        });
        let request = CompletionRequest {
            model: self.config.model.clone(),
            messages,
            system: Some(SYSTEM_PROMPT.to_string()),
            max_tokens: self.config.max_tokens,
            temperature: Some(self.config.temperature),
            stream: true,
        };

        let mut llm_stream = self.provider.stream(request);

        // The first frame tells us whether the gateway accepted the call;
        // a refusal here surfaces as a request-level error with nothing
        // streamed yet.
        let pending = match llm_stream.next().await {
            Some(Ok(StreamEvent::Connected)) | None => Vec::new(),
            Some(Ok(event)) => vec![Ok(event)],
            Some(Err(e)) => return Err(RelayError::Gateway(e)),
        };
        let llm_stream = stream::iter(pending).chain(llm_stream);

        info!(user_id = %user_id, session_id = %session_id, "exchange admitted");

        let turns = Arc::clone(&self.turns);
        let profiles = Arc::clone(&self.profiles);
        let ledger = self.ledger.clone();
        let sid = session_id.clone();

        let events = Box::pin(async_stream::stream! {
            let mut full_response = String::new();
            let mut had_error = false;

            let mut llm_stream = std::pin::pin!(llm_stream);
            while let Some(event) = llm_stream.next().await {
                match event {
                    Ok(StreamEvent::TextDelta { text }) => {
                        full_response.push_str(&text);
                        yield RelayEvent::Delta(text);
                    }
                    Ok(StreamEvent::Done) => break,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(session_id = %sid, error = %e, "model stream failed mid-response");
                        yield RelayEvent::Error(e.to_string());
                        had_error = true;
                        break;
                    }
                }
            }

            if !had_error && !full_response.is_empty() {
                Self::finish_exchange(&turns, &profiles, &ledger, user_id, &sid, full_response)
                    .await;
            }

            yield RelayEvent::Done;
        });

        Ok(RelayReply { session_id, events })
    }

    /// Completion bookkeeping: assistant turn, usage counter, streak.
    ///
    /// Runs after the full response has been delivered, so failures are
    /// logged rather than surfaced.
    async fn finish_exchange(
        turns: &T,
        profiles: &P,
        ledger: &UsageLedger<T, U>,
        user_id: Uuid,
        session_id: &str,
        full_response: String,
    ) {
        let assistant_turn = ChatTurn::new(
            session_id.to_string(),
            user_id,
            MessageRole::Assistant,
            full_response,
        );
        if let Err(e) = turns.save_turn(&assistant_turn).await {
            error!(session_id, error = %e, "failed to persist assistant turn");
        }

        let now = Utc::now();
        if let Err(e) = ledger.record_exchange(&user_id, now).await {
            warn!(user_id = %user_id, error = %e, "failed to record usage");
        }

        match profiles.get(&user_id).await {
            Ok(Some(profile)) => {
                let update = streak::update_on_activity(profile.streak, profile.last_active_at, now);
                if let Err(e) = profiles
                    .update_activity(&user_id, update.streak, update.last_active_at)
                    .await
                {
                    warn!(user_id = %user_id, error = %e, "failed to update streak");
                }
            }
            Ok(None) => {
                warn!(user_id = %user_id, "activity update for unknown user");
            }
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "failed to load profile for streak update");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        turn_at, MemoryProfileRepository, MemoryTurnRepository, MemoryUsageRepository,
        ScriptedProvider,
    };
    use chrono::Duration;
    use nova_types::user::UserProfile;

    struct Harness {
        turns: Arc<MemoryTurnRepository>,
        profiles: Arc<MemoryProfileRepository>,
        provider: Arc<ScriptedProvider>,
        relay: ChatRelay<
            MemoryTurnRepository,
            MemoryProfileRepository,
            MemoryUsageRepository,
            ScriptedProvider,
        >,
        user_id: Uuid,
    }

    async fn harness(provider: ScriptedProvider) -> Harness {
        let turns = Arc::new(MemoryTurnRepository::default());
        let profiles = Arc::new(MemoryProfileRepository::default());
        let usage = Arc::new(MemoryUsageRepository::default());
        let provider = Arc::new(provider);

        let profile = UserProfile::new("user@example.com".to_string());
        let user_id = profile.id;
        profiles.create(&profile).await.unwrap();

        let relay = ChatRelay::new(
            Arc::clone(&turns),
            Arc::clone(&profiles),
            usage,
            Arc::clone(&provider),
            RelayConfig::default(),
        );

        Harness {
            turns,
            profiles,
            provider,
            relay,
            user_id,
        }
    }

    fn submit(session_id: Option<&str>, message: &str) -> SubmitTurn {
        SubmitTurn {
            session_id: session_id.map(String::from),
            prior_turns: Vec::new(),
            message: message.to_string(),
        }
    }

    async fn drain(mut events: RelayStream) -> Vec<RelayEvent> {
        let mut collected = Vec::new();
        while let Some(event) = events.next().await {
            collected.push(event);
        }
        collected
    }

    #[tokio::test]
    async fn test_end_to_end_exchange() {
        let h = harness(ScriptedProvider::with_chunks(vec!["Hi ", "there!"])).await;

        let reply = h
            .relay
            .submit(h.user_id, submit(Some("S1"), "Hello"))
            .await
            .unwrap();
        assert_eq!(reply.session_id, "S1");

        let events = drain(reply.events).await;
        assert_eq!(
            events,
            vec![
                RelayEvent::Delta("Hi ".to_string()),
                RelayEvent::Delta("there!".to_string()),
                RelayEvent::Done,
            ]
        );

        // Exactly two turns: the user's and the full assistant text.
        let turns = h.turns.get_session_turns(&h.user_id, "S1").await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, MessageRole::User);
        assert_eq!(turns[0].content, "Hello");
        assert_eq!(turns[1].role, MessageRole::Assistant);
        assert_eq!(turns[1].content, "Hi there!");

        // Usage counted once; streak started.
        let record = h
            .relay
            .ledger()
            .today_record(&h.user_id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.query_count, 1);

        let profile = h.profiles.get(&h.user_id).await.unwrap().unwrap();
        assert_eq!(profile.streak, 1);
        assert!(profile.last_active_at.is_some());
    }

    #[tokio::test]
    async fn test_generates_session_id_when_absent() {
        let h = harness(ScriptedProvider::with_chunks(vec!["ok"])).await;

        let reply = h.relay.submit(h.user_id, submit(None, "Hello")).await.unwrap();
        assert!(!reply.session_id.is_empty());
        assert!(reply.session_id.parse::<Uuid>().is_ok());

        drain(reply.events).await;
        let turns = h
            .turns
            .get_session_turns(&h.user_id, &reply.session_id)
            .await
            .unwrap();
        assert_eq!(turns.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_is_invalid() {
        let h = harness(ScriptedProvider::with_chunks(vec!["ok"])).await;

        let err = h
            .relay
            .submit(h.user_id, submit(Some("S1"), "   "))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
        assert_eq!(h.provider.stream_calls(), 0);
        assert!(h.turns.all().await.is_empty());
    }

    #[tokio::test]
    async fn test_blank_prior_turn_is_invalid() {
        let h = harness(ScriptedProvider::with_chunks(vec!["ok"])).await;

        let input = SubmitTurn {
            session_id: Some("S1".to_string()),
            prior_turns: vec![Message {
                role: MessageRole::Assistant,
                content: "  ".to_string(),
            }],
            message: "Hello".to_string(),
        };
        let err = h.relay.submit(h.user_id, input).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_hourly_quota_rejection_has_no_side_effects() {
        let h = harness(ScriptedProvider::with_chunks(vec!["ok"])).await;
        let now = Utc::now();

        for i in 0..50 {
            h.turns
                .push(turn_at(
                    h.user_id,
                    "S1",
                    MessageRole::User,
                    now - Duration::minutes(i),
                ))
                .await;
        }

        let err = h
            .relay
            .submit(h.user_id, submit(Some("S1"), "one more"))
            .await
            .unwrap_err();
        match err {
            RelayError::QuotaExceeded { scope, limit } => {
                assert_eq!(scope, QuotaScope::Hourly);
                assert_eq!(limit, 50);
            }
            other => panic!("expected quota rejection, got {other:?}"),
        }

        // Rejected before the gateway was touched or anything persisted.
        assert_eq!(h.provider.stream_calls(), 0);
        assert_eq!(h.turns.all().await.len(), 50);
        assert!(h
            .relay
            .ledger()
            .today_record(&h.user_id, now)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_gateway_connect_failure_keeps_user_turn() {
        let h = harness(ScriptedProvider::failing()).await;

        let err = h
            .relay
            .submit(h.user_id, submit(Some("S1"), "Hello"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::Gateway(_)));

        // The user turn was committed before the gateway call.
        let turns = h.turns.get_session_turns(&h.user_id, "S1").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, MessageRole::User);

        // Nothing further: no usage, no streak.
        assert!(h
            .relay
            .ledger()
            .today_record(&h.user_id, Utc::now())
            .await
            .unwrap()
            .is_none());
        let profile = h.profiles.get(&h.user_id).await.unwrap().unwrap();
        assert_eq!(profile.streak, 0);
    }

    #[tokio::test]
    async fn test_mid_stream_failure_skips_bookkeeping() {
        let h = harness(ScriptedProvider::failing_mid_stream(vec!["par", "tial"])).await;

        let reply = h
            .relay
            .submit(h.user_id, submit(Some("S1"), "Hello"))
            .await
            .unwrap();
        let events = drain(reply.events).await;

        assert!(matches!(events[0], RelayEvent::Delta(_)));
        assert!(matches!(events[2], RelayEvent::Error(_)));
        assert_eq!(*events.last().unwrap(), RelayEvent::Done);

        // Only the user turn is recorded; the partial response is not.
        let turns = h.turns.get_session_turns(&h.user_id, "S1").await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].role, MessageRole::User);
        assert!(h
            .relay
            .ledger()
            .today_record(&h.user_id, Utc::now())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_streak_unchanged_on_second_exchange_same_day() {
        let h = harness(ScriptedProvider::with_chunks(vec!["a"])).await;

        for _ in 0..2 {
            let reply = h
                .relay
                .submit(h.user_id, submit(Some("S1"), "Hello"))
                .await
                .unwrap();
            drain(reply.events).await;
        }

        let profile = h.profiles.get(&h.user_id).await.unwrap().unwrap();
        assert_eq!(profile.streak, 1);

        let record = h
            .relay
            .ledger()
            .today_record(&h.user_id, Utc::now())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.query_count, 2);
    }

    #[tokio::test]
    async fn test_session_history_is_ordered() {
        let h = harness(ScriptedProvider::with_chunks(vec!["a"])).await;
        let now = Utc::now();

        // Insert out of order; reads must come back by timestamp.
        for offset in [3i64, 1, 2] {
            h.turns
                .push(turn_at(
                    h.user_id,
                    "S9",
                    MessageRole::User,
                    now - Duration::minutes(offset),
                ))
                .await;
        }

        let turns = h.turns.get_session_turns(&h.user_id, "S9").await.unwrap();
        let times: Vec<_> = turns.iter().map(|t| t.created_at).collect();
        let mut sorted = times.clone();
        sorted.sort();
        assert_eq!(times, sorted);
    }
}
