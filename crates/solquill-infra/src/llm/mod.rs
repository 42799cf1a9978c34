//! LLM provider implementations.
//!
//! Contains the Anthropic implementation of the [`LlmProvider`] trait
//! defined in `solquill-core`, and [`build_provider`] which constructs it
//! from configuration.
//!
//! [`LlmProvider`]: solquill_core::llm::LlmProvider

pub mod anthropic;

use secrecy::SecretString;

use solquill_core::llm::BoxLlmProvider;
use solquill_types::config::LlmConfig;
use solquill_types::llm::LlmError;

use self::anthropic::AnthropicProvider;

/// Environment variable holding the Anthropic API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Build the configured provider, reading the API key from
/// `ANTHROPIC_API_KEY`.
pub fn build_provider(config: &LlmConfig) -> Result<BoxLlmProvider, LlmError> {
    let key = std::env::var(API_KEY_ENV).ok();
    create_provider(config, key.as_deref())
}

/// Build the provider with an explicit key. A missing or blank key is
/// [`LlmError::AuthenticationFailed`].
pub fn create_provider(config: &LlmConfig, api_key: Option<&str>) -> Result<BoxLlmProvider, LlmError> {
    let key = api_key
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .ok_or(LlmError::AuthenticationFailed)?;

    let mut provider = AnthropicProvider::new(SecretString::from(key.to_string()), config.model.clone())?;
    if let Some(base_url) = &config.base_url {
        provider = provider.with_base_url(base_url.clone());
    }
    Ok(BoxLlmProvider::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_provider_requires_key() {
        let config = LlmConfig::default();
        assert!(matches!(
            create_provider(&config, None),
            Err(LlmError::AuthenticationFailed)
        ));
        assert!(matches!(
            create_provider(&config, Some("   ")),
            Err(LlmError::AuthenticationFailed)
        ));
    }

    #[test]
    fn test_create_provider_with_key() {
        let config = LlmConfig {
            base_url: Some("http://localhost:8080".to_string()),
            ..LlmConfig::default()
        };
        let provider = create_provider(&config, Some("sk-ant-test")).unwrap();
        assert_eq!(provider.name(), "anthropic");
    }
}
