//! Chat history HTTP handlers.
//!
//! Endpoints:
//! - GET    /api/v1/chats              - Recent session summaries
//! - GET    /api/v1/chats/{session_id} - Ordered turns of one session
//! - DELETE /api/v1/chats/{session_id} - Delete a session's turns
//!
//! All lookups are scoped to the calling user; another user's sessions
//! are indistinguishable from missing ones.

use std::time::Instant;

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use nova_core::chat::repository::TurnRepository;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Sidebar titles show at most this many characters of the last turn.
const TITLE_MAX_CHARS: usize = 30;

/// Query parameters for the session listing.
#[derive(Debug, Deserialize)]
pub struct ChatListQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    5
}

/// GET /api/v1/chats - Recent session summaries for the caller.
pub async fn list_chats(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Query(query): Query<ChatListQuery>,
) -> Result<ApiResponse<Vec<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let summaries = state
        .turns
        .list_recent_sessions(&user_id, query.limit.max(1))
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let chats: Vec<serde_json::Value> = summaries
        .iter()
        .map(|s| {
            serde_json::json!({
                "id": s.session_id,
                "title": s.title(TITLE_MAX_CHARS),
                "timestamp": s.last_at.to_rfc3339(),
            })
        })
        .collect();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(chats, request_id, elapsed).with_link("self", "/api/v1/chats"))
}

/// GET /api/v1/chats/{session_id} - Ordered turns of one owned session.
///
/// An unknown (or someone else's) session id yields an empty list, the
/// same as a session whose turns were all deleted.
pub async fn get_chat(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<Vec<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let turns = state
        .turns
        .get_session_turns(&user_id, &session_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let messages: Vec<serde_json::Value> = turns
        .iter()
        .map(|t| {
            serde_json::json!({
                "id": t.id,
                "role": t.role,
                "content": t.content,
                "created_at": t.created_at.to_rfc3339(),
            })
        })
        .collect();

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(
        ApiResponse::success(messages, request_id, elapsed)
            .with_link("self", &format!("/api/v1/chats/{session_id}")),
    )
}

/// DELETE /api/v1/chats/{session_id} - Delete all turns of an owned session.
pub async fn delete_chat(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(session_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let removed = state
        .turns
        .delete_session(&user_id, &session_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if removed == 0 {
        return Err(AppError::NotFound(format!(
            "No session '{session_id}' for this user"
        )));
    }

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(
        serde_json::json!({ "deleted": true, "turns_removed": removed }),
        request_id,
        elapsed,
    ))
}
