//! Per-chat virtual file store with bounded version history.

use std::collections::{BTreeMap, VecDeque};

use chrono::Utc;
use serde::{Deserialize, Serialize};

use solquill_types::error::StoreError;
use solquill_types::file::{FileVersion, VirtualFile};

use super::canonical::canonical_name;

/// Maximum number of prior versions retained per file.
pub const HISTORY_LIMIT: usize = 5;

/// Result of a [`VirtualFileStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub canonical_name: String,
    /// `false` when the content matched the current version.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileEntry {
    current: VirtualFile,
    #[serde(default)]
    history: VecDeque<FileVersion>,
}

/// Map of canonical file name to the current version and its history.
///
/// History is a FIFO: index 0 is the oldest retained version and indices
/// shift every time a changing write pushes a new entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VirtualFileStore {
    files: BTreeMap<String, FileEntry>,
}

impl VirtualFileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `content` as the current version of `path`.
    ///
    /// Identical content is a no-op and leaves history untouched.
    pub fn put(&mut self, path: &str, content: &str, language: &str) -> PutOutcome {
        let name = canonical_name(path);
        let file = VirtualFile {
            canonical_name: name.clone(),
            content: content.to_string(),
            language: language.to_string(),
            timestamp: Utc::now(),
        };

        let changed = match self.files.get_mut(&name) {
            Some(entry) if entry.current.content == content => false,
            Some(entry) => {
                entry.history.push_back(FileVersion::from(&entry.current));
                while entry.history.len() > HISTORY_LIMIT {
                    entry.history.pop_front();
                }
                entry.current = file;
                true
            }
            None => {
                self.files.insert(
                    name.clone(),
                    FileEntry {
                        current: file,
                        history: VecDeque::new(),
                    },
                );
                true
            }
        };

        PutOutcome {
            canonical_name: name,
            changed,
        }
    }

    /// Current version (`version == None`) or the retained version at FIFO
    /// position `k`.
    pub fn get(&self, path: &str, version: Option<usize>) -> Result<FileVersion, StoreError> {
        let name = canonical_name(path);
        let entry = self
            .files
            .get(&name)
            .ok_or_else(|| StoreError::FileNotFound(name.clone()))?;

        match version {
            None => Ok(FileVersion::from(&entry.current)),
            Some(k) => entry
                .history
                .get(k)
                .cloned()
                .ok_or(StoreError::VersionNotFound {
                    path: name,
                    version: k,
                }),
        }
    }

    pub fn current(&self, path: &str) -> Option<&VirtualFile> {
        self.files.get(&canonical_name(path)).map(|e| &e.current)
    }

    /// Retained prior versions of `path`, oldest first.
    pub fn history(&self, path: &str) -> Vec<FileVersion> {
        self.files
            .get(&canonical_name(path))
            .map(|e| e.history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove a file and all of its history. Returns whether it existed.
    pub fn delete(&mut self, path: &str) -> bool {
        self.files.remove(&canonical_name(path)).is_some()
    }

    /// Canonical name to current version; history is excluded.
    pub fn listing(&self) -> BTreeMap<String, VirtualFile> {
        self.files
            .iter()
            .map(|(name, entry)| (name.clone(), entry.current.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.files.clear();
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_grows_to_limit_then_evicts_oldest() {
        let mut store = VirtualFileStore::new();
        for i in 1..=8 {
            store.put("Token.sol", &format!("v{i}"), "solidity");
            assert_eq!(store.history("Token.sol").len(), (i - 1).min(HISTORY_LIMIT));
        }

        let contents: Vec<_> = store
            .history("Token.sol")
            .into_iter()
            .map(|v| v.content)
            .collect();
        assert_eq!(contents, vec!["v3", "v4", "v5", "v6", "v7"]);
        assert_eq!(store.get("Token.sol", None).unwrap().content, "v8");
    }

    #[test]
    fn test_identical_put_is_noop() {
        let mut store = VirtualFileStore::new();
        assert!(store.put("Token.sol", "a", "solidity").changed);
        assert!(store.put("Token.sol", "b", "solidity").changed);
        let before = store.history("Token.sol");

        let outcome = store.put("Token.sol", "b", "solidity");
        assert!(!outcome.changed);
        assert_eq!(outcome.canonical_name, "Token.sol");
        assert_eq!(store.history("Token.sol"), before);
    }

    #[test]
    fn test_aliases_resolve_to_one_file() {
        let mut store = VirtualFileStore::new();
        store.put("contracts/Token_999.sol", "contract Token {}", "solidity");

        let version = store.get("contracts/Token_other.sol", None).unwrap();
        assert_eq!(version.content, "contract Token {}");
        assert_eq!(store.len(), 1);
        assert!(store.listing().contains_key("Token.sol"));
    }

    #[test]
    fn test_get_version_by_fifo_index() {
        let mut store = VirtualFileStore::new();
        store.put("A.sol", "one", "solidity");
        store.put("A.sol", "two", "solidity");
        store.put("A.sol", "three", "solidity");

        assert_eq!(store.get("A.sol", Some(0)).unwrap().content, "one");
        assert_eq!(store.get("A.sol", Some(1)).unwrap().content, "two");
        assert_eq!(
            store.get("A.sol", Some(2)).unwrap_err(),
            StoreError::VersionNotFound {
                path: "A.sol".to_string(),
                version: 2
            }
        );
    }

    #[test]
    fn test_get_missing_file() {
        let store = VirtualFileStore::new();
        assert!(matches!(
            store.get("Nope.sol", None),
            Err(StoreError::FileNotFound(name)) if name == "Nope.sol"
        ));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let mut store = VirtualFileStore::new();
        store.put("A.sol", "x", "solidity");
        store.put("A.sol", "y", "solidity");

        assert!(store.delete("contracts/A_1.sol"));
        assert!(!store.delete("A.sol"));
        assert!(store.history("A.sol").is_empty());
        assert!(store.get("A.sol", None).is_err());
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut store = VirtualFileStore::new();
        store.put("A.sol", "x", "solidity");
        store.put("B.sol", "y", "solidity");
        store.clear();
        assert!(store.is_empty());
        assert!(store.listing().is_empty());
    }

    #[test]
    fn test_serde_keeps_history() {
        let mut store = VirtualFileStore::new();
        store.put("A.sol", "x", "solidity");
        store.put("A.sol", "y", "solidity");

        let json = serde_json::to_string(&store).unwrap();
        let restored: VirtualFileStore = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.history("A.sol").len(), 1);
        assert_eq!(restored.current("A.sol").unwrap().content, "y");
    }
}
