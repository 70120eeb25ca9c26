//! LLM gateway implementations.

pub mod gemini;
