//! Business logic and collaborator trait definitions for Solquill.
//!
//! This crate defines the chat and virtual file stores, the text-to-action
//! extractor, the conversational agent and the per-connection dispatcher,
//! together with the "ports" (LLM, compiler, persistence, event sink) that
//! the infrastructure and API layers implement. It depends only on
//! `solquill-types` -- never on `solquill-infra` or any database/IO crate.

pub mod agent;
pub mod chat;
pub mod compile;
pub mod extract;
pub mod file;
pub mod llm;
pub mod session;
