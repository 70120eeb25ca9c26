//! Observability helpers for Nova.

pub mod tracing_setup;
