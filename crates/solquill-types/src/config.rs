//! Server configuration types.
//!
//! `ServerConfig` represents `config.toml` in the data directory. Every field
//! has a default so a missing or partial file still yields a usable config.

use serde::{Deserialize, Serialize};

use crate::file::DEFAULT_LANGUAGE;

/// Top-level configuration for the Solquill server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub agent: AgentConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub compiler: CompilerConfig,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            llm: LlmConfig::default(),
            agent: AgentConfig::default(),
            storage: StorageConfig::default(),
            compiler: CompilerConfig::default(),
        }
    }
}

/// Language model request parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Override for the provider endpoint (proxies, local gateways).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_temperature() -> f64 {
    0.7
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            base_url: None,
        }
    }
}

/// Conversational turn behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Delay between streamed events of one turn, in milliseconds.
    #[serde(default)]
    pub pacing_ms: u64,

    /// Fence tag that marks a code block as a file operation.
    #[serde(default = "default_fence_language")]
    pub fence_language: String,

    /// Model round trips spent repairing a contract that fails to compile.
    /// Zero disables the repair loop.
    #[serde(default = "default_max_fix_attempts")]
    pub max_fix_attempts: u32,
}

fn default_fence_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

fn default_max_fix_attempts() -> u32 {
    5
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 0,
            fence_language: default_fence_language(),
            max_fix_attempts: default_max_fix_attempts(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Write chats back to `solquill.db` in the data directory.
    #[serde(default = "default_persist")]
    pub persist: bool,
}

fn default_persist() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: default_persist(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompilerConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_solc_path")]
    pub solc_path: String,
}

fn default_solc_path() -> String {
    "solc".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            solc_path: default_solc_path(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_config_default_values() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8000);
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.agent.pacing_ms, 0);
        assert_eq!(config.agent.fence_language, "solidity");
        assert_eq!(config.agent.max_fix_attempts, 5);
        assert!(config.storage.persist);
        assert!(!config.compiler.enabled);
        assert_eq!(config.compiler.solc_path, "solc");
    }

    #[test]
    fn test_server_config_deserialize_empty() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.port, 8000);
        assert_eq!(config.llm.temperature, 0.7);
    }

    #[test]
    fn test_server_config_deserialize_partial_sections() {
        let toml_str = r#"
port = 9100

[llm]
model = "claude-3-5-haiku-latest"

[agent]
pacing_ms = 400
max_fix_attempts = 0

[compiler]
enabled = true
"#;
        let config: ServerConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9100);
        assert_eq!(config.llm.model, "claude-3-5-haiku-latest");
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.agent.pacing_ms, 400);
        assert_eq!(config.agent.fence_language, "solidity");
        assert_eq!(config.agent.max_fix_attempts, 0);
        assert!(config.compiler.enabled);
        assert_eq!(config.compiler.solc_path, "solc");
    }

    #[test]
    fn test_server_config_rejects_wrong_types() {
        assert!(toml::from_str::<ServerConfig>("port = \"eighty\"").is_err());
    }
}
