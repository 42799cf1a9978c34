//! Observability for Solquill: tracing subscriber setup and the GenAI span
//! attribute names used to instrument language model calls.

pub mod genai_attrs;
pub mod tracing_setup;
