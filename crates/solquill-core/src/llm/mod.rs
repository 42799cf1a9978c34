//! Language model port: the provider trait and its type-erased wrapper.

pub mod box_provider;
pub mod provider;

pub use box_provider::BoxLlmProvider;
pub use provider::LlmProvider;
