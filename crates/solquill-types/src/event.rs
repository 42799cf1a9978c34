//! Outbound WebSocket events.
//!
//! Every event serializes as `{"type": ..., "content": ..., "metadata": ...}`.
//! File-shaped events always carry `metadata.path`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::ChatSummary;
use crate::compile::CompilationResult;
use crate::identity::ChatId;

/// Metadata attached to file-shaped events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<ChatId>,
}

impl FileMetadata {
    pub fn path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            canonical_name: None,
            language: None,
            chat_id: None,
        }
    }
}

/// Metadata attached to `file_version` replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionMetadata {
    pub path: String,
    pub canonical_name: String,
    /// Requested history index, `None` for the current version.
    pub version: Option<usize>,
    pub timestamp: DateTime<Utc>,
    /// Number of retained prior versions at the time of the reply. History
    /// indices are FIFO positions and shift on every changing write.
    pub history_len: usize,
}

/// Metadata attached to `chat_synced` replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMetadata {
    pub chat_id: ChatId,
    pub imported_messages: usize,
    pub dropped_messages: usize,
    pub files: usize,
    pub full_reset: bool,
}

/// Metadata attached to chat lifecycle replies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMetadata {
    pub chat_id: ChatId,
}

/// An event streamed to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Message {
        content: String,
    },
    FileCreate {
        content: String,
        metadata: FileMetadata,
    },
    CodeEdit {
        content: String,
        metadata: FileMetadata,
    },
    FileDelete {
        content: String,
        metadata: FileMetadata,
    },
    CompilationResult {
        content: CompilationResult,
        metadata: FileMetadata,
    },
    Error {
        content: String,
    },
    FileSaved {
        content: String,
        metadata: FileMetadata,
    },
    FileVersion {
        content: String,
        metadata: VersionMetadata,
    },
    ChatSynced {
        content: ChatSummary,
        metadata: SyncMetadata,
    },
    ChatsLoaded {
        content: Vec<ChatSummary>,
    },
    ChatCreated {
        content: ChatSummary,
    },
    ChatDeleted {
        content: String,
        metadata: ChatMetadata,
    },
    Pong {
        content: String,
    },
}

impl ServerEvent {
    pub fn message(content: impl Into<String>) -> Self {
        ServerEvent::Message {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        ServerEvent::Error {
            content: content.into(),
        }
    }

    pub fn pong() -> Self {
        ServerEvent::Pong {
            content: String::new(),
        }
    }

    /// Wire tag of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            ServerEvent::Message { .. } => "message",
            ServerEvent::FileCreate { .. } => "file_create",
            ServerEvent::CodeEdit { .. } => "code_edit",
            ServerEvent::FileDelete { .. } => "file_delete",
            ServerEvent::CompilationResult { .. } => "compilation_result",
            ServerEvent::Error { .. } => "error",
            ServerEvent::FileSaved { .. } => "file_saved",
            ServerEvent::FileVersion { .. } => "file_version",
            ServerEvent::ChatSynced { .. } => "chat_synced",
            ServerEvent::ChatsLoaded { .. } => "chats_loaded",
            ServerEvent::ChatCreated { .. } => "chat_created",
            ServerEvent::ChatDeleted { .. } => "chat_deleted",
            ServerEvent::Pong { .. } => "pong",
        }
    }

    /// Text to record in the chat transcript when this event is the result
    /// of an assistant action. Control replies are not recorded.
    pub fn transcript_text(&self) -> Option<String> {
        match self {
            ServerEvent::Message { content }
            | ServerEvent::FileCreate { content, .. }
            | ServerEvent::CodeEdit { content, .. } => Some(content.clone()),
            ServerEvent::FileDelete { metadata, .. } => Some(format!("Deleted {}", metadata.path)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_message_event_shape() {
        let value = serde_json::to_value(ServerEvent::message("hello")).unwrap();
        assert_eq!(value, json!({"type": "message", "content": "hello"}));
    }

    #[test]
    fn test_file_event_carries_path() {
        let event = ServerEvent::FileCreate {
            content: "contract A {}".to_string(),
            metadata: FileMetadata {
                language: Some("solidity".to_string()),
                ..FileMetadata::path("contracts/Contract_0.sol")
            },
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "file_create");
        assert_eq!(value["metadata"]["path"], "contracts/Contract_0.sol");
        assert_eq!(value["metadata"]["language"], "solidity");
        assert!(value["metadata"].get("chat_id").is_none());
    }

    #[test]
    fn test_pong_shape() {
        assert_eq!(
            serde_json::to_string(&ServerEvent::pong()).unwrap(),
            r#"{"type":"pong","content":""}"#
        );
    }

    #[test]
    fn test_kind_matches_serialized_tag() {
        let events = [
            ServerEvent::error("boom"),
            ServerEvent::FileDelete {
                content: String::new(),
                metadata: FileMetadata::path("A.sol"),
            },
            ServerEvent::CompilationResult {
                content: CompilationResult::default(),
                metadata: FileMetadata::path("A.sol"),
            },
            ServerEvent::ChatsLoaded { content: vec![] },
        ];
        for event in events {
            let value = serde_json::to_value(&event).unwrap();
            assert_eq!(value["type"], event.kind());
        }
    }

    #[test]
    fn test_transcript_text() {
        assert_eq!(
            ServerEvent::message("hi").transcript_text().as_deref(),
            Some("hi")
        );
        let delete = ServerEvent::FileDelete {
            content: String::new(),
            metadata: FileMetadata::path("Token.sol"),
        };
        assert_eq!(delete.transcript_text().as_deref(), Some("Deleted Token.sol"));
        assert!(ServerEvent::error("x").transcript_text().is_none());
        assert!(ServerEvent::pong().transcript_text().is_none());
    }
}
