//! Virtual file types.
//!
//! Virtual files live only in chat state. They are identified by a canonical
//! name derived from the path the client or the assistant used.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Language tag applied when a caller does not supply one.
pub const DEFAULT_LANGUAGE: &str = "solidity";

/// The current version of a logical file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirtualFile {
    pub canonical_name: String,
    pub content: String,
    pub language: String,
    pub timestamp: DateTime<Utc>,
}

/// A retained prior version of a file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileVersion {
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl From<&VirtualFile> for FileVersion {
    fn from(file: &VirtualFile) -> Self {
        Self {
            content: file.content.clone(),
            timestamp: file.timestamp,
        }
    }
}
