use thiserror::Error;

use crate::identity::ChatId;
use crate::llm::LlmError;

/// Malformed input at the transport boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("invalid owner identity: '{0}'")]
    InvalidOwner(String),

    #[error("invalid chat id: '{0}'")]
    InvalidChatId(String),

    #[error("malformed frame: {0}")]
    MalformedFrame(String),
}

/// Errors from chat and virtual file store lookups.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("chat '{0}' not found")]
    ChatNotFound(ChatId),

    #[error("file '{0}' not found")]
    FileNotFound(String),

    #[error("version {version} of '{path}' not found")]
    VersionNotFound { path: String, version: usize },

    /// Persisted state could not be read, so ownership of the chat is unknown.
    #[error("chat '{0}' is temporarily unavailable")]
    Unavailable(ChatId),
}

/// Errors from the persistence adapter.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors from the compilation collaborator.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compiler unavailable: {0}")]
    Unavailable(String),

    #[error("compilation failed to run: {0}")]
    Failed(String),
}

/// Any per-frame failure. Rendered to exactly one `error` event at the
/// dispatch boundary; the connection stays open.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("language model request failed: {0}")]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("unknown frame type '{0}'")]
    UnknownKind(String),
}
