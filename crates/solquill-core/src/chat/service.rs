//! Chat service: the in-memory store plus optional write-back persistence.
//!
//! Every mutating call is followed by a `save` of the affected chat when a
//! repository is configured. Persistence failures are logged and never fail
//! the in-memory operation, so a broken database degrades the server to
//! memory-only rather than taking conversations down.

use std::collections::BTreeMap;

use tracing::{info, warn};

use solquill_types::chat::{ChatSummary, Message};
use solquill_types::error::StoreError;
use solquill_types::frame::ImportedFile;
use solquill_types::identity::{ChatId, OwnerId};

use crate::file::PutOutcome;

use super::repository::ChatRepository;
use super::store::{ChatStore, SyncOutcome};

/// Orchestrates chat state and its persistence.
///
/// Generic over `ChatRepository` to maintain clean architecture
/// (solquill-core never depends on solquill-infra).
pub struct ChatService<R: ChatRepository> {
    store: ChatStore,
    repository: Option<R>,
}

impl<R: ChatRepository> ChatService<R> {
    /// Service backed by a persistence adapter.
    pub fn new(repository: R) -> Self {
        Self {
            store: ChatStore::new(),
            repository: Some(repository),
        }
    }

    /// Service without persistence.
    pub fn in_memory() -> Self {
        Self {
            store: ChatStore::new(),
            repository: None,
        }
    }

    /// Read access to the underlying store.
    pub fn store(&self) -> &ChatStore {
        &self.store
    }

    pub fn is_persistent(&self) -> bool {
        self.repository.is_some()
    }

    // --- Chat lifecycle ---

    /// Return the owner's chat, restoring it from persistence or creating it
    /// on first reference.
    ///
    /// Fails with `ChatNotFound` when the id already belongs to another
    /// owner; chat ids are never shared across partitions.
    pub async fn open_chat(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        name: Option<&str>,
    ) -> Result<(ChatSummary, bool), StoreError> {
        if !self.store.contains(owner, chat_id) {
            self.ensure_unclaimed(owner, chat_id).await?;
        }

        let (summary, created) = self.store.get_or_create(owner, chat_id, name);
        if created {
            info!(owner = %owner, chat_id = %chat_id, name = %summary.name, "chat created");
        }
        self.persist(owner, chat_id).await;
        Ok((summary, created))
    }

    /// Make sure an existing chat is in memory without creating it.
    pub async fn require_chat(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<(), StoreError> {
        if self.store.contains(owner, chat_id) {
            return Ok(());
        }
        self.ensure_unclaimed(owner, chat_id).await?;
        if self.store.contains(owner, chat_id) {
            Ok(())
        } else {
            Err(StoreError::ChatNotFound(chat_id.clone()))
        }
    }

    /// Restore every persisted chat of an owner that is not already in
    /// memory, and return the owner's chat summaries.
    pub async fn load_owner(&self, owner: &OwnerId) -> Vec<ChatSummary> {
        if let Some(repo) = &self.repository {
            match repo.list_for_owner(owner).await {
                Ok(chats) => {
                    let mut restored = 0;
                    for chat in chats {
                        if !self.store.contains(owner, &chat.id) {
                            self.store.restore(chat);
                            restored += 1;
                        }
                    }
                    if restored > 0 {
                        info!(owner = %owner, restored, "restored chats from storage");
                    }
                }
                Err(e) => warn!(owner = %owner, error = %e, "failed to load persisted chats"),
            }
        }
        self.store.list_chats(owner)
    }

    /// Discard a chat entirely before a full resynchronization.
    pub async fn reset_chat(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<(), StoreError> {
        self.ensure_unclaimed(owner, chat_id).await?;
        if self.store.delete_chat(owner, chat_id).is_ok() {
            info!(owner = %owner, chat_id = %chat_id, "chat reset for full sync");
        }
        self.forget(chat_id).await;
        Ok(())
    }

    pub async fn delete_chat(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<(), StoreError> {
        self.require_chat(owner, chat_id).await?;
        self.store.delete_chat(owner, chat_id)?;
        self.forget(chat_id).await;
        info!(owner = %owner, chat_id = %chat_id, "chat deleted");
        Ok(())
    }

    /// Release an owner's file state on disconnect.
    pub async fn cleanup(&self, owner: &OwnerId) {
        let affected = self.store.cleanup(owner);
        for chat_id in self.store.chat_ids(owner) {
            self.persist(owner, &chat_id).await;
        }
        info!(owner = %owner, chats = affected, "owner state cleaned up");
    }

    // --- Mutations ---

    pub async fn append_message(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        message: Message,
    ) -> Result<(), StoreError> {
        self.store.append_message(owner, chat_id, message)?;
        self.persist(owner, chat_id).await;
        Ok(())
    }

    pub async fn put_file(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
        content: &str,
        language: &str,
    ) -> Result<PutOutcome, StoreError> {
        let outcome = self.store.put_file(owner, chat_id, path, content, language)?;
        if outcome.changed {
            self.persist(owner, chat_id).await;
        }
        Ok(outcome)
    }

    pub async fn delete_file(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        path: &str,
    ) -> Result<bool, StoreError> {
        let removed = self.store.delete_file(owner, chat_id, path)?;
        if removed {
            self.persist(owner, chat_id).await;
        }
        Ok(removed)
    }

    pub async fn replace_history(
        &self,
        owner: &OwnerId,
        chat_id: &ChatId,
        messages: &[serde_json::Value],
        files: &BTreeMap<String, ImportedFile>,
    ) -> Result<SyncOutcome, StoreError> {
        let outcome = self.store.replace_history(owner, chat_id, messages, files)?;
        self.persist(owner, chat_id).await;
        Ok(outcome)
    }

    // --- Persistence ---

    /// Restore `chat_id` from persistence if it is unknown in memory, and
    /// reject ids owned by someone else.
    async fn ensure_unclaimed(&self, owner: &OwnerId, chat_id: &ChatId) -> Result<(), StoreError> {
        if let Some(existing) = self.store.find_by_chat_id(chat_id) {
            if &existing.owner != owner {
                warn!(owner = %owner, chat_id = %chat_id, "chat id belongs to another owner");
                return Err(StoreError::ChatNotFound(chat_id.clone()));
            }
            return Ok(());
        }

        let Some(repo) = &self.repository else {
            return Ok(());
        };

        match repo.load(chat_id).await {
            Ok(Some(chat)) if &chat.owner == owner => {
                info!(owner = %owner, chat_id = %chat_id, "chat restored from storage");
                self.store.restore(chat);
                Ok(())
            }
            Ok(Some(_)) => {
                warn!(owner = %owner, chat_id = %chat_id, "persisted chat belongs to another owner");
                Err(StoreError::ChatNotFound(chat_id.clone()))
            }
            Ok(None) => Ok(()),
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "failed to load chat from storage");
                Err(StoreError::Unavailable(chat_id.clone()))
            }
        }
    }

    async fn persist(&self, owner: &OwnerId, chat_id: &ChatId) {
        let Some(repo) = &self.repository else {
            return;
        };
        let chat = match self.store.snapshot(owner, chat_id) {
            Ok(chat) => chat,
            Err(_) => return,
        };
        if let Err(e) = repo.save(&chat).await {
            warn!(owner = %owner, chat_id = %chat_id, error = %e, "failed to persist chat");
        }
    }

    async fn forget(&self, chat_id: &ChatId) {
        let Some(repo) = &self.repository else {
            return;
        };
        if let Err(e) = repo.delete(chat_id).await {
            warn!(chat_id = %chat_id, error = %e, "failed to delete persisted chat");
        }
    }
}
