//! Shared domain types for Solquill.
//!
//! This crate contains the types used across the Solquill workspace:
//! owner and chat identifiers, chat messages, virtual files, extracted
//! actions, the WebSocket wire protocol, configuration and error enums.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod action;
pub mod chat;
pub mod compile;
pub mod config;
pub mod error;
pub mod event;
pub mod file;
pub mod frame;
pub mod identity;
pub mod llm;
