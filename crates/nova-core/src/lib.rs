//! Business logic and repository trait definitions for Nova.
//!
//! This crate defines the "ports" (repository traits) that the
//! infrastructure layer implements, plus the chat relay that orchestrates
//! them. It depends only on `nova-types` -- never on `nova-infra` or any
//! database/IO crate.

pub mod badge;
pub mod chat;
pub mod llm;
pub mod profile;
pub mod quota;
pub mod relay;
pub mod streak;

#[cfg(test)]
pub(crate) mod testing;
