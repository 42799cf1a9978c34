//! Inbound WebSocket frames.
//!
//! Frames are JSON objects with a `type` tag (defaulting to `"message"`) and
//! type-specific fields. Parsing produces a closed set of variants; a tag the
//! server does not know becomes [`ClientFrame::Unknown`] so the dispatcher can
//! answer it with an error instead of dropping the connection.
//!
//! Chat ids are accepted as `chat_id`, `chatId` or `contextId` and validated
//! later, at dispatch time.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::FormatError;
use crate::file::DEFAULT_LANGUAGE;

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

/// Editor state the client attaches to a conversational frame.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    #[serde(default)]
    pub current_file: Option<String>,
    #[serde(default)]
    pub current_code: Option<String>,
    #[serde(default)]
    pub file_system: serde_json::Value,
}

/// A user turn.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageFrame {
    #[serde(default)]
    pub content: String,
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub context: RequestContext,
}

/// A file supplied by a history sync: either bare content or content with a
/// language tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImportedFile {
    Plain(String),
    Detailed {
        content: String,
        #[serde(default = "default_language")]
        language: String,
    },
}

impl ImportedFile {
    pub fn content(&self) -> &str {
        match self {
            ImportedFile::Plain(content) | ImportedFile::Detailed { content, .. } => content,
        }
    }

    pub fn language(&self) -> &str {
        match self {
            ImportedFile::Plain(_) => DEFAULT_LANGUAGE,
            ImportedFile::Detailed { language, .. } => language,
        }
    }
}

/// Authoritative transcript and file snapshot pushed by a client.
///
/// `messages` stay loosely typed: each entry is validated individually and
/// malformed entries are dropped without failing the sync.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncFrame {
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
    #[serde(default)]
    pub files: BTreeMap<String, ImportedFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SaveFileFrame {
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
    pub path: String,
    pub content: String,
    #[serde(default = "default_language")]
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileVersionFrame {
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
    pub path: String,
    #[serde(default)]
    pub version: Option<usize>,
}

/// A frame naming one file of a chat.
#[derive(Debug, Clone, Deserialize)]
pub struct FileRefFrame {
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
    pub path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateChatFrame {
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRefFrame {
    #[serde(default, alias = "chatId", alias = "contextId")]
    pub chat_id: Option<String>,
}

/// Every frame kind the server understands.
#[derive(Debug, Clone)]
pub enum ClientFrame {
    Message(MessageFrame),
    SyncChatHistory(SyncFrame),
    FullHistorySync(SyncFrame),
    SaveFile(SaveFileFrame),
    GetFileVersion(FileVersionFrame),
    DeleteFile(FileRefFrame),
    Compile(FileRefFrame),
    CreateChat(CreateChatFrame),
    ListChats,
    DeleteChat(ChatRefFrame),
    Ping,
    Unknown { kind: String },
}

impl ClientFrame {
    /// Parse a text frame.
    ///
    /// Fails only when the text is not a JSON object or when a known frame
    /// kind is missing required fields.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| FormatError::MalformedFrame(e.to_string()))?;

        if !value.is_object() {
            return Err(FormatError::MalformedFrame(
                "frame must be a JSON object".to_string(),
            ));
        }

        let kind = value
            .get("type")
            .and_then(|t| t.as_str())
            .unwrap_or("message")
            .to_string();

        let frame = match kind.as_str() {
            "message" => ClientFrame::Message(payload(value)?),
            "sync_chat_history" => ClientFrame::SyncChatHistory(payload(value)?),
            "full_history_sync" => ClientFrame::FullHistorySync(payload(value)?),
            "save_file" => ClientFrame::SaveFile(payload(value)?),
            "get_file_version" => ClientFrame::GetFileVersion(payload(value)?),
            "delete_file" => ClientFrame::DeleteFile(payload(value)?),
            "compile" => ClientFrame::Compile(payload(value)?),
            "create_chat" => ClientFrame::CreateChat(payload(value)?),
            "list_chats" => ClientFrame::ListChats,
            "delete_chat" => ClientFrame::DeleteChat(payload(value)?),
            "ping" => ClientFrame::Ping,
            _ => ClientFrame::Unknown { kind },
        };

        Ok(frame)
    }

    /// Wire tag of this frame.
    pub fn kind(&self) -> &str {
        match self {
            ClientFrame::Message(_) => "message",
            ClientFrame::SyncChatHistory(_) => "sync_chat_history",
            ClientFrame::FullHistorySync(_) => "full_history_sync",
            ClientFrame::SaveFile(_) => "save_file",
            ClientFrame::GetFileVersion(_) => "get_file_version",
            ClientFrame::DeleteFile(_) => "delete_file",
            ClientFrame::Compile(_) => "compile",
            ClientFrame::CreateChat(_) => "create_chat",
            ClientFrame::ListChats => "list_chats",
            ClientFrame::DeleteChat(_) => "delete_chat",
            ClientFrame::Ping => "ping",
            ClientFrame::Unknown { kind } => kind,
        }
    }
}

fn payload<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, FormatError> {
    serde_json::from_value(value).map_err(|e| FormatError::MalformedFrame(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_defaults_to_message() {
        let frame = ClientFrame::parse(r#"{"content": "write a token"}"#).unwrap();
        match frame {
            ClientFrame::Message(msg) => {
                assert_eq!(msg.content, "write a token");
                assert!(msg.chat_id.is_none());
                assert!(msg.context.current_file.is_none());
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[test]
    fn test_message_context_is_camel_case() {
        let frame = ClientFrame::parse(
            r#"{"type":"message","content":"fix it","chatId":"c1",
                "context":{"currentFile":"contracts/Token.sol","currentCode":"contract Token {}","fileSystem":{"Token.sol":{}}}}"#,
        )
        .unwrap();
        let ClientFrame::Message(msg) = frame else {
            panic!("expected message");
        };
        assert_eq!(msg.chat_id.as_deref(), Some("c1"));
        assert_eq!(msg.context.current_file.as_deref(), Some("contracts/Token.sol"));
        assert_eq!(msg.context.current_code.as_deref(), Some("contract Token {}"));
        assert!(msg.context.file_system.is_object());
    }

    #[test]
    fn test_unknown_kind_is_preserved() {
        let frame = ClientFrame::parse(r#"{"type":"teleport","content":"x"}"#).unwrap();
        assert!(matches!(&frame, ClientFrame::Unknown { kind } if kind == "teleport"));
        assert_eq!(frame.kind(), "teleport");
    }

    #[test]
    fn test_non_object_and_invalid_json_are_rejected() {
        assert!(matches!(
            ClientFrame::parse("[1,2]"),
            Err(FormatError::MalformedFrame(_))
        ));
        assert!(matches!(
            ClientFrame::parse("{not json"),
            Err(FormatError::MalformedFrame(_))
        ));
    }

    #[test]
    fn test_save_file_requires_path() {
        assert!(ClientFrame::parse(r#"{"type":"save_file","content":"x"}"#).is_err());
        let frame =
            ClientFrame::parse(r#"{"type":"save_file","path":"A.sol","content":"x"}"#).unwrap();
        let ClientFrame::SaveFile(save) = frame else {
            panic!("expected save_file");
        };
        assert_eq!(save.language, "solidity");
    }

    #[test]
    fn test_sync_frame_accepts_plain_and_detailed_files() {
        let frame = ClientFrame::parse(
            r##"{"type":"full_history_sync","contextId":"c9",
                "messages":[{"text":"hi","sender":"user"},{"sender":"ai"}],
                "files":{"A.sol":"contract A {}","B.vy":{"content":"# b","language":"vyper"}}}"##,
        )
        .unwrap();
        let ClientFrame::FullHistorySync(sync) = frame else {
            panic!("expected full_history_sync");
        };
        assert_eq!(sync.chat_id.as_deref(), Some("c9"));
        assert_eq!(sync.messages.len(), 2);
        assert_eq!(sync.files["A.sol"].language(), "solidity");
        assert_eq!(sync.files["B.vy"].language(), "vyper");
        assert_eq!(sync.files["B.vy"].content(), "# b");
    }

    #[test]
    fn test_get_file_version_optional_index() {
        let frame =
            ClientFrame::parse(r#"{"type":"get_file_version","path":"A.sol","version":2}"#)
                .unwrap();
        let ClientFrame::GetFileVersion(req) = frame else {
            panic!("expected get_file_version");
        };
        assert_eq!(req.version, Some(2));
    }
}
