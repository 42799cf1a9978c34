//! OpenTelemetry GenAI Semantic Convention attribute constants.
//!
//! The agent opens a `gen_ai.chat` span per model call with the request
//! attributes and empty response fields; providers fill the response fields
//! in through [`tracing::Span::record`] with these names.

/// The number of input tokens consumed.
pub const GEN_AI_USAGE_INPUT_TOKENS: &str = "gen_ai.usage.input_tokens";

/// The number of output tokens generated.
pub const GEN_AI_USAGE_OUTPUT_TOKENS: &str = "gen_ai.usage.output_tokens";

/// The unique response/message ID from the provider.
pub const GEN_AI_RESPONSE_ID: &str = "gen_ai.response.id";

/// Anthropic provider identifier.
pub const PROVIDER_ANTHROPIC: &str = "anthropic";
