//! In-memory chat store partitioned by owner.
//!
//! Each owner gets its own partition in a sharded concurrent map, so different
//! owners never contend on the same lock. All operations are synchronous and
//! never hold a partition guard across an `.await`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use solquill_types::chat::{ChatStatus, ChatSummary, Message};
use solquill_types::error::StoreError;
use solquill_types::file::{FileVersion, VirtualFile};
use solquill_types::frame::ImportedFile;
use solquill_types::identity::{ChatId, OwnerId};

use crate::file::{PutOutcome, VirtualFileStore};

/// A conversation thread with its transcript and virtual files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: ChatId,
    pub name: String,
    pub owner: OwnerId,
    pub created_at: DateTime<Utc>,
    pub last_accessed: DateTime<Utc>,
    #[serde(default)]
    pub status: ChatStatus,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub files: VirtualFileStore,
}

impl Chat {
    pub fn new(owner: OwnerId, id: ChatId, name: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            name,
            owner,
            created_at: now,
            last_accessed: now,
            status: ChatStatus::Active,
            messages: Vec::new(),
            files: VirtualFileStore::new(),
        }
    }

    pub fn summary(&self) -> ChatSummary {
        ChatSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            owner: self.owner.clone(),
            created_at: self.created_at,
            last_accessed: self.last_accessed,
            status: self.status,
            message_count: self.messages.len(),
            file_count: self.files.len(),
        }
    }

    fn touch(&mut self) {
        self.last_accessed = Utc::now();
        self.status = ChatStatus::Active;
    }
}

/// Counts reported by [`ChatStore::replace_history`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOutcome {
    pub accepted: usize,
    pub dropped: usize,
    pub files: usize,
}

/// Owner-partitioned map of chats.
#[derive(Default)]
pub struct ChatStore {
    partitions: DashMap<OwnerId, BTreeMap<ChatId, Chat>>,
}

impl ChatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` against a chat under a shared guard.
    pub fn read<T>(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        f: impl FnOnce(&Chat) -> T,
    ) -> Result<T, StoreError> {
        let partition = self
            .partitions
            .get(owner)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))?;
        let chat = partition
            .get(chat_id)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))?;
        Ok(f(chat))
    }

    /// Run `f` against a chat under an exclusive guard, touching its
    /// last-accessed timestamp.
    pub fn write<T>(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        f: impl FnOnce(&mut Chat) -> T,
    ) -> Result<T, StoreError> {
        let mut partition = self
            .partitions
            .get_mut(owner)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))?;
        let chat = partition
            .get_mut(chat_id)
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))?;
        chat.touch();
        Ok(f(chat))
    }

    /// Return the chat, creating an empty one on first reference.
    ///
    /// The boolean is `true` when the chat was created. A new chat without a
    /// name is called `Chat N`, N being the owner's chat count after insertion.
    pub fn get_or_create(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        name: Option<&str>,
    ) -> (ChatSummary, bool) {
        let mut partition = self.partitions.entry(owner.clone()).or_default();

        if let Some(chat) = partition.get_mut(chat_id) {
            chat.touch();
            return (chat.summary(), false);
        }

        let name = match name.map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Chat {}", partition.len() + 1),
        };
        let chat = Chat::new(owner.clone(), chat_id.clone(), name);
        let summary = chat.summary();
        partition.insert(chat_id.clone(), chat);

        tracing::debug!(owner = %owner, chat_id = %chat_id, "created chat");
        (summary, true)
    }

    pub fn contains(&self, owner: &OwnerId, chat_id: &ChatId) -> bool {
        self.partitions
            .get(owner)
            .is_some_and(|partition| partition.contains_key(chat_id))
    }

    pub fn append_message(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        message: Message,
    ) -> Result<(), StoreError> {
        self.write(owner, chat_id, |chat| chat.messages.push(message))
    }

    pub fn transcript(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<Vec<Message>, StoreError> {
        self.read(owner, chat_id, |chat| chat.messages.clone())
    }

    pub fn put_file(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
        content: &str,
        language: &str,
    ) -> Result<PutOutcome, StoreError> {
        self.write(owner, chat_id, |chat| chat.files.put(path, content, language))
    }

    pub fn get_file(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
        version: Option<usize>,
    ) -> Result<FileVersion, StoreError> {
        self.read(owner, chat_id, |chat| chat.files.get(path, version))?
    }

    pub fn current_file(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
    ) -> Result<Option<VirtualFile>, StoreError> {
        self.read(owner, chat_id, |chat| chat.files.current(path).cloned())
    }

    pub fn file_history(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
    ) -> Result<Vec<FileVersion>, StoreError> {
        self.read(owner, chat_id, |chat| chat.files.history(path))
    }

    pub fn delete_file(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
    ) -> Result<bool, StoreError> {
        self.write(owner, chat_id, |chat| chat.files.delete(path))
    }

    pub fn list_files(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
    ) -> Result<BTreeMap<String, VirtualFile>, StoreError> {
        self.read(owner, chat_id, |chat| chat.files.listing())
    }

    /// Replace the transcript with an imported one and `put` the imported
    /// files.
    ///
    /// Entries without a string `text` and a `user`/`ai` sender are dropped.
    pub fn replace_history(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        messages: &[serde_json::Value],
        files: &BTreeMap<String, ImportedFile>,
    ) -> Result<SyncOutcome, StoreError> {
        let imported: Vec<Message> = messages.iter().filter_map(Message::from_imported).collect();
        let accepted = imported.len();
        let dropped = messages.len() - accepted;

        self.write(owner, chat_id, |chat| {
            chat.messages = imported;
            for (path, file) in files {
                chat.files.put(path, file.content(), file.language());
            }
        })?;

        if dropped > 0 {
            tracing::debug!(owner = %owner, chat_id = %chat_id, dropped, "dropped malformed imported messages");
        }

        Ok(SyncOutcome {
            accepted,
            dropped,
            files: files.len(),
        })
    }

    /// Locate a chat by id across every owner.
    pub fn find_by_chat_id(&self, chat_id: &ChatId) -> Option<ChatSummary> {
        self.partitions
            .iter()
            .find_map(|partition| partition.get(chat_id).map(Chat::summary))
    }

    /// Release an owner's file state and mark their chats disconnected.
    /// Transcripts are kept. Returns the number of chats affected.
    pub fn cleanup(&self, owner: &OwnerId) -> usize {
        let Some(mut partition) = self.partitions.get_mut(owner) else {
            return 0;
        };
        for chat in partition.values_mut() {
            chat.files.clear();
            chat.status = ChatStatus::Disconnected;
        }
        partition.len()
    }

    /// Summaries of an owner's chats, oldest first.
    pub fn list_chats(&self, owner: &OwnerId) -> Vec<ChatSummary> {
        let mut summaries: Vec<ChatSummary> = self
            .partitions
            .get(owner)
            .map(|partition| partition.values().map(Chat::summary).collect())
            .unwrap_or_default();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    pub fn chat_ids(&self, owner: &OwnerId) -> Vec<ChatId> {
        self.partitions
            .get(owner)
            .map(|partition| partition.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn delete_chat(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<Chat, StoreError> {
        self.partitions
            .get_mut(owner)
            .and_then(|mut partition| partition.remove(chat_id))
            .ok_or_else(|| StoreError::ChatNotFound(chat_id.clone()))
    }

    /// Full clone of a chat, for persistence.
    pub fn snapshot(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<Chat, StoreError> {
        self.read(owner, chat_id, Chat::clone)
    }

    /// Insert a chat loaded from persistence, replacing any in-memory copy.
    pub fn restore(&self, chat: Chat) {
        self.partitions
            .entry(chat.owner.clone())
            .or_default()
            .insert(chat.id.clone(), chat);
    }
}
