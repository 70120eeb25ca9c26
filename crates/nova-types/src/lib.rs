//! Shared domain types for Nova.
//!
//! This crate contains the core domain types used across the Nova chat
//! service: chat turns, user profiles, usage records, quota policy, and
//! the LLM request/stream shapes.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod llm;
pub mod usage;
pub mod user;
