//! Infrastructure adapters for Solquill: SQLite chat persistence, the
//! Anthropic LLM client, the `solc` compiler and the config loader.

pub mod compile;
pub mod config;
pub mod llm;
pub mod sqlite;
