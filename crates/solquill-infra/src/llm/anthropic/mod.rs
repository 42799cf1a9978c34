//! Anthropic Claude LLM provider implementation.
//!
//! This module provides the [`AnthropicProvider`] which implements the
//! [`LlmProvider`](solquill_core::llm::LlmProvider) trait for the Anthropic
//! Messages API.

pub mod client;
pub mod types;

pub use client::AnthropicProvider;
