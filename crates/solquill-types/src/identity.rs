//! Owner and chat identifiers.
//!
//! Both identifiers are validated at the transport boundary, before any
//! chat state is created for them. Invalid input yields a [`FormatError`].

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FormatError;

/// Fixed prefix of an owner identity.
const OWNER_PREFIX: &str = "0x";

/// Number of hex digits following the prefix.
const OWNER_HEX_LEN: usize = 40;

/// Upper bound on client-chosen chat ids.
const MAX_CHAT_ID_LEN: usize = 128;

/// Identity of the tenant that owns a set of chats.
///
/// The reference format is a wallet-style address: `0x` followed by exactly
/// 40 hex digits. Addresses are normalized to lowercase so that differently
/// cased spellings of one wallet land in the same partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Validate and normalize a raw owner identity.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let trimmed = raw.trim();
        let hex = trimmed
            .strip_prefix(OWNER_PREFIX)
            .ok_or_else(|| FormatError::InvalidOwner(raw.to_string()))?;

        if hex.len() != OWNER_HEX_LEN || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(FormatError::InvalidOwner(raw.to_string()));
        }

        Ok(Self(format!("{OWNER_PREFIX}{}", hex.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OwnerId {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(id: OwnerId) -> Self {
        id.0
    }
}

/// Identifier of a chat.
///
/// Client-chosen ids are accepted when they are 1..=128 characters of
/// `[A-Za-z0-9_-]` (UUIDs qualify). Server-minted ids are UUIDv7 strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ChatId(String);

impl ChatId {
    /// Validate a raw chat id.
    pub fn parse(raw: &str) -> Result<Self, FormatError> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_CHAT_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(FormatError::InvalidChatId(raw.to_string()))
        }
    }

    /// Mint a fresh, time-sortable chat id.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ChatId {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ChatId {
    type Error = FormatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ChatId> for String {
    fn from(id: ChatId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x52908400098527886E0F7030069857D2E4169EE7";

    #[test]
    fn test_owner_id_normalizes_case() {
        let owner = OwnerId::parse(WALLET).unwrap();
        assert_eq!(owner.as_str(), "0x52908400098527886e0f7030069857d2e4169ee7");
        assert_eq!(owner, OwnerId::parse(&WALLET.to_lowercase()).unwrap());
    }

    #[test]
    fn test_owner_id_rejects_bad_format() {
        for raw in [
            "",
            "52908400098527886E0F7030069857D2E4169EE7",
            "0x1234",
            "0xZZ908400098527886E0F7030069857D2E4169EE7",
            "0x52908400098527886E0F7030069857D2E4169EE7ff",
        ] {
            assert!(
                matches!(OwnerId::parse(raw), Err(FormatError::InvalidOwner(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_owner_id_serde_validates() {
        let json = format!("\"{WALLET}\"");
        let owner: OwnerId = serde_json::from_str(&json).unwrap();
        assert!(owner.as_str().starts_with("0x5290"));
        assert!(serde_json::from_str::<OwnerId>("\"nope\"").is_err());
    }

    #[test]
    fn test_chat_id_accepts_uuid_and_slugs() {
        assert!(ChatId::parse("0190a3b2-7c1e-7d4f-9a7b-3f2e1d0c9b8a").is_ok());
        assert!(ChatId::parse("main_chat-2").is_ok());
    }

    #[test]
    fn test_chat_id_rejects_bad_format() {
        assert!(ChatId::parse("").is_err());
        assert!(ChatId::parse("has space").is_err());
        assert!(ChatId::parse("../etc/passwd").is_err());
        assert!(ChatId::parse(&"a".repeat(129)).is_err());
    }

    #[test]
    fn test_generated_chat_ids_are_valid_and_distinct() {
        let a = ChatId::generate();
        let b = ChatId::generate();
        assert_ne!(a, b);
        assert!(ChatId::parse(a.as_str()).is_ok());
    }
}
