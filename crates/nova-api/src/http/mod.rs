//! HTTP/REST API layer for Nova.
//!
//! Axum-based REST API at `/api/v1/` with API key authentication,
//! envelope response format, CORS support, and an SSE chat stream.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
