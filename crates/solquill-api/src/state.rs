//! Application state wiring all services together.
//!
//! Built once in `main` and cloned into every handler. Services are generic
//! over the repository trait; AppState pins them to the SQLite adapter.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use solquill_core::agent::AgentSettings;
use solquill_core::chat::ChatService;
use solquill_core::compile::BoxCompiler;
use solquill_core::llm::BoxLlmProvider;
use solquill_core::session::ConnectionRegistry;
use solquill_infra::compile::SolcCompiler;
use solquill_infra::llm::{build_provider, API_KEY_ENV};
use solquill_infra::sqlite::{DatabasePool, SqliteChatRepository};
use solquill_types::config::ServerConfig;

pub type ConcreteChatService = ChatService<SqliteChatRepository>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    pub data_dir: PathBuf,
    pub chat_service: Arc<ConcreteChatService>,
    pub llm: Arc<BoxLlmProvider>,
    pub compiler: Option<Arc<BoxCompiler>>,
    pub connections: Arc<ConnectionRegistry>,
}

impl AppState {
    /// Connect to the database, build the LLM client and check that the compiler runs.
    pub async fn init(config: ServerConfig, data_dir: PathBuf) -> anyhow::Result<Self> {
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("creating data directory {}", data_dir.display()))?;

        let chat_service = if config.storage.persist {
            let pool = DatabasePool::open_in(&data_dir)
                .await
                .context("opening solquill.db")?;
            ChatService::new(SqliteChatRepository::new(pool))
        } else {
            tracing::info!("persistence disabled, chats live in memory only");
            ChatService::in_memory()
        };

        let llm = build_provider(&config.llm)
            .with_context(|| format!("building LLM client (is {API_KEY_ENV} set?)"))?;

        let compiler = if config.compiler.enabled {
            let solc = SolcCompiler::new(config.compiler.solc_path.clone());
            match solc.version().await {
                Ok(version) => {
                    tracing::info!(%version, "solc available");
                    Some(Arc::new(BoxCompiler::new(solc)))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "compiler disabled");
                    None
                }
            }
        } else {
            None
        };

        Ok(Self::new(config, data_dir, chat_service, llm, compiler))
    }

    pub fn new(
        config: ServerConfig,
        data_dir: PathBuf,
        chat_service: ConcreteChatService,
        llm: BoxLlmProvider,
        compiler: Option<Arc<BoxCompiler>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            data_dir,
            chat_service: Arc::new(chat_service),
            llm: Arc::new(llm),
            compiler,
            connections: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// Turn settings for a new connection's agent.
    pub fn agent_settings(&self) -> AgentSettings {
        AgentSettings::from_config(&self.config.llm, &self.config.agent)
    }
}
