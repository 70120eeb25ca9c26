//! HTTP request handlers for the REST API.

pub mod badge;
pub mod chat;
pub mod chats;
pub mod user;
