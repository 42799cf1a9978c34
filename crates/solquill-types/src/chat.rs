//! Chat message and chat summary types for Solquill.
//!
//! A chat is a named conversation thread scoped to one owner. Messages are
//! immutable once appended and their insertion order is significant.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

use crate::identity::{ChatId, OwnerId};

/// Who wrote a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

impl fmt::Display for Sender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Ai => write!(f, "ai"),
        }
    }
}

impl FromStr for Sender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Sender::User),
            "ai" => Ok(Sender::Ai),
            other => Err(format!("invalid sender: '{other}'")),
        }
    }
}

/// Connection status of a chat.
///
/// A chat becomes `Disconnected` when its owner's connection goes away and
/// its in-memory file state is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatStatus {
    #[default]
    Active,
    Disconnected,
}

/// A single message within a chat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Outbound event type that produced an AI message (e.g. "code_edit").
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
}

impl Message {
    /// A message typed by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            action_type: None,
        }
    }

    /// A message produced by the assistant, tagged with the event type that
    /// carried it to the client.
    pub fn ai(text: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            sender: Sender::Ai,
            text: text.into(),
            timestamp: Utc::now(),
            action_type: Some(action_type.into()),
        }
    }

    /// Build a message from a loosely-typed client transcript entry.
    ///
    /// Returns `None` unless the entry carries at least a string `text` and a
    /// valid `sender`. `id`, `timestamp` (epoch milliseconds or RFC 3339) and
    /// `type` are optional and replaced with fresh values when unusable.
    pub fn from_imported(entry: &serde_json::Value) -> Option<Self> {
        let text = entry.get("text")?.as_str()?;
        let sender: Sender = entry.get("sender")?.as_str()?.parse().ok()?;

        let id = entry
            .get("id")
            .and_then(|v| v.as_str())
            .and_then(|s| Uuid::parse_str(s).ok())
            .unwrap_or_else(Uuid::now_v7);

        let timestamp = entry
            .get("timestamp")
            .and_then(parse_timestamp)
            .unwrap_or_else(Utc::now);

        let action_type = entry
            .get("type")
            .and_then(|v| v.as_str())
            .map(str::to_string);

        Some(Self {
            id,
            sender,
            text: text.to_string(),
            timestamp,
            action_type,
        })
    }
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => {
            let millis = n.as_f64()?;
            DateTime::from_timestamp_millis(millis as i64)
        }
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

/// Lightweight view of a chat for listings and sync acknowledgements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: ChatId,
    pub name: String,
    pub owner: OwnerId,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    pub status: ChatStatus,
    pub message_count: usize,
    pub file_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sender_roundtrip() {
        for sender in [Sender::User, Sender::Ai] {
            let parsed: Sender = sender.to_string().parse().unwrap();
            assert_eq!(parsed, sender);
        }
        assert!("assistant".parse::<Sender>().is_err());
    }

    #[test]
    fn test_chat_status_default() {
        assert_eq!(ChatStatus::default(), ChatStatus::Active);
        assert_eq!(
            serde_json::to_string(&ChatStatus::Disconnected).unwrap(),
            "\"disconnected\""
        );
    }

    #[test]
    fn test_import_requires_text_and_sender() {
        assert!(Message::from_imported(&json!({"text": "hi", "sender": "user"})).is_some());
        assert!(Message::from_imported(&json!({"sender": "user"})).is_none());
        assert!(Message::from_imported(&json!({"text": "hi"})).is_none());
        assert!(Message::from_imported(&json!({"text": 42, "sender": "user"})).is_none());
        assert!(Message::from_imported(&json!({"text": "hi", "sender": "robot"})).is_none());
        assert!(Message::from_imported(&json!("just a string")).is_none());
    }

    #[test]
    fn test_import_keeps_optional_fields() {
        let id = Uuid::now_v7();
        let msg = Message::from_imported(&json!({
            "id": id.to_string(),
            "text": "pragma solidity ^0.8.20;",
            "sender": "ai",
            "timestamp": 1_700_000_000_000u64,
            "type": "file_create"
        }))
        .unwrap();

        assert_eq!(msg.id, id);
        assert_eq!(msg.sender, Sender::Ai);
        assert_eq!(msg.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(msg.action_type.as_deref(), Some("file_create"));
    }

    #[test]
    fn test_import_replaces_unusable_id_and_timestamp() {
        let msg = Message::from_imported(&json!({
            "id": "not-a-uuid",
            "text": "hello",
            "sender": "user",
            "timestamp": "yesterday"
        }))
        .unwrap();
        assert_eq!(msg.text, "hello");
        assert!(msg.action_type.is_none());
    }

    #[test]
    fn test_message_serializes_action_type_as_type() {
        let msg = Message::ai("contract A {}", "code_edit");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "code_edit");
        assert_eq!(value["sender"], "ai");
    }
}
