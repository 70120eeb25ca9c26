//! Current-user profile and usage endpoint.
//!
//! GET /api/v1/user - Profile plus today's usage counters.

use std::time::Instant;

use axum::extract::State;
use chrono::Utc;
use uuid::Uuid;

use nova_core::profile::repository::ProfileRepository;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/user - The calling user's profile and today's usage.
///
/// `query_count`/`image_count` are zero when no exchange completed today
/// (the usage record is created lazily).
pub async fn get_user(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let profile = state
        .profiles
        .get(&user_id)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let usage = state
        .relay
        .ledger()
        .today_record(&user_id, Utc::now())
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let data = serde_json::json!({
        "id": profile.id,
        "email": profile.email,
        "streak": profile.streak,
        "badges": profile.badges,
        "query_count": usage.as_ref().map(|u| u.query_count).unwrap_or(0),
        "image_count": usage.as_ref().map(|u| u.image_count).unwrap_or(0),
    });

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(data, request_id, elapsed)
        .with_link("self", "/api/v1/user")
        .with_link("chats", "/api/v1/chats"))
}
