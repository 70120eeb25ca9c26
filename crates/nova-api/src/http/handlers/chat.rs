//! SSE streaming chat endpoint.
//!
//! POST /api/v1/chat/stream
//!
//! Accepts the conversation so far plus an optional session id, hands the
//! exchange to the relay, and forwards its events as Server-Sent Events.
//! Quota rejections, invalid input, and gateway refusals happen before
//! the stream starts and surface as plain HTTP errors.
//!
//! SSE event types:
//! - `session` — initial event with `{ "session_id": "..." }`
//! - `delta`   — incremental text: `{ "text": "..." }`
//! - `error`   — mid-stream failure: `{ "message": "..." }`
//! - `done`    — stream complete: `{}`

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use nova_core::relay::{RelayEvent, SubmitTurn};
use nova_types::llm::{Message, MessageRole};

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::state::AppState;

/// Request body for the streaming chat endpoint.
#[derive(Debug, Deserialize)]
pub struct StreamChatRequest {
    /// Existing session to continue; a new id is generated if absent.
    pub session_id: Option<String>,
    /// The conversation so far, oldest first. The final entry must be
    /// the new user message.
    pub messages: Vec<IncomingMessage>,
}

/// One client-supplied message. The role arrives as a string so that an
/// unknown role is a validation error rather than a deserialization one.
#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    pub content: String,
}

fn parse_role(role: &str) -> Result<MessageRole, AppError> {
    role.parse::<MessageRole>().map_err(AppError::Validation)
}

/// POST /api/v1/chat/stream — SSE streaming chat.
pub async fn stream_chat(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Json(body): Json<StreamChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let mut messages = body.messages;
    let last = messages
        .pop()
        .ok_or_else(|| AppError::Validation("messages must not be empty".to_string()))?;
    if parse_role(&last.role)? != MessageRole::User {
        return Err(AppError::Validation(
            "the final message must be a user turn".to_string(),
        ));
    }

    let prior_turns = messages
        .into_iter()
        .map(|m| {
            Ok(Message {
                role: parse_role(&m.role)?,
                content: m.content,
            })
        })
        .collect::<Result<Vec<_>, AppError>>()?;

    let reply = state
        .relay
        .submit(
            user_id,
            SubmitTurn {
                session_id: body.session_id,
                prior_turns,
                message: last.content,
            },
        )
        .await?;

    let session_id = reply.session_id;
    let relay_events = reply.events;

    let sse_stream = async_stream::stream! {
        // The active session id is always the first fragment.
        let session_json = serde_json::json!({ "session_id": session_id });
        yield Ok::<_, Infallible>(
            Event::default().event("session").data(session_json.to_string()),
        );

        let mut relay_events = std::pin::pin!(relay_events);
        while let Some(event) = relay_events.next().await {
            match event {
                RelayEvent::Delta(text) => {
                    let data = serde_json::json!({ "text": text });
                    yield Ok(Event::default().event("delta").data(data.to_string()));
                }
                RelayEvent::Error(message) => {
                    let data = serde_json::json!({ "message": message });
                    yield Ok(Event::default().event("error").data(data.to_string()));
                }
                RelayEvent::Done => {
                    yield Ok(Event::default().event("done").data("{}"));
                }
            }
        }
    };

    Ok(Sse::new(sse_stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}
