//! Google Gemini provider (generateContent / streamGenerateContent).

mod client;
mod streaming;
mod types;

pub use client::GeminiProvider;
