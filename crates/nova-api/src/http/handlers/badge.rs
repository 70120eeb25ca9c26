//! Badge check endpoint.
//!
//! POST /api/v1/badges/check - Award any newly earned badges.
//!
//! Idempotent: calling it again without new turns returns an empty
//! `new_badges` list and leaves the badge set unchanged.

use std::time::Instant;

use axum::extract::State;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::extractors::auth::AuthenticatedUser;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// POST /api/v1/badges/check - Run the badge check for the caller.
pub async fn check_badges(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let outcome = state.badges.check(&user_id).await?;

    let data = serde_json::json!({
        "new_badges": outcome.new_badges,
        "all_badges": outcome.all_badges,
        "celebration": outcome.celebration,
    });

    let elapsed = start.elapsed().as_millis() as u64;
    Ok(ApiResponse::success(data, request_id, elapsed).with_link("self", "/api/v1/badges/check"))
}
