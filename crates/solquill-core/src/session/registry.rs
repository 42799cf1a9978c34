//! Process-wide registry of live connections, one slot per owner.
//!
//! Registering a connection for an owner that already has one cancels the
//! older connection. Releasing a slot only succeeds for the connection that
//! currently holds it, so a replaced connection never cleans up state its
//! successor is using.

use dashmap::DashMap;
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use solquill_types::identity::OwnerId;

use crate::chat::{ChatRepository, ChatService};

/// Handle returned to a newly registered connection.
#[derive(Debug, Clone)]
pub struct ConnectionTicket {
    pub id: Uuid,
    /// Cancelled when the connection is replaced or the server shuts down.
    pub cancel: CancellationToken,
}

#[derive(Debug)]
struct ConnectionSlot {
    id: Uuid,
    cancel: CancellationToken,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    slots: DashMap<OwnerId, ConnectionSlot>,
    shutdown: CancellationToken,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the owner's slot, cancelling any previous connection.
    pub fn register(&self, owner: &OwnerId) -> ConnectionTicket {
        let ticket = ConnectionTicket {
            id: Uuid::now_v7(),
            cancel: self.shutdown.child_token(),
        };
        let slot = ConnectionSlot {
            id: ticket.id,
            cancel: ticket.cancel.clone(),
        };

        if let Some(previous) = self.slots.insert(owner.clone(), slot) {
            previous.cancel.cancel();
            info!(owner = %owner, replaced = %previous.id, "connection replaced");
        }
        ticket
    }

    /// Give up the slot if `id` still holds it. Returns `true` when the
    /// caller was the current connection.
    pub fn release(&self, owner: &OwnerId, id: Uuid) -> bool {
        self.slots
            .remove_if(owner, |_, slot| slot.id == id)
            .is_some()
    }

    /// End connection `id`. The owner's transient state is cleaned up only
    /// when `id` still held the slot; returns whether that happened.
    pub async fn finish<R: ChatRepository>(
        &self,
        owner: &OwnerId,
        id: Uuid,
        chats: &ChatService<R>,
    ) -> bool {
        if !self.release(owner, id) {
            return false;
        }
        chats.cleanup(owner).await;
        true
    }

    pub fn is_current(&self, owner: &OwnerId, id: Uuid) -> bool {
        self.slots.get(owner).is_some_and(|slot| slot.id == id)
    }

    pub fn active_count(&self) -> usize {
        self.slots.len()
    }

    /// Cancel every live connection.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use solquill_types::chat::ChatStatus;
    use solquill_types::error::RepositoryError;
    use solquill_types::identity::ChatId;

    use crate::chat::Chat;

    struct NoRepository;

    impl ChatRepository for NoRepository {
        async fn load(&self, _: &ChatId) -> Result<Option<Chat>, RepositoryError> {
            Ok(None)
        }
        async fn save(&self, _: &Chat) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn delete(&self, _: &ChatId) -> Result<(), RepositoryError> {
            Ok(())
        }
        async fn list_for_owner(&self, _: &OwnerId) -> Result<Vec<Chat>, RepositoryError> {
            Ok(Vec::new())
        }
    }

    fn owner() -> OwnerId {
        OwnerId::parse("0xdddddddddddddddddddddddddddddddddddddddd").unwrap()
    }

    #[test]
    fn test_new_connection_cancels_previous() {
        let registry = ConnectionRegistry::new();
        let first = registry.register(&owner());
        let second = registry.register(&owner());

        assert!(first.cancel.is_cancelled());
        assert!(!second.cancel.is_cancelled());
        assert!(registry.is_current(&owner(), second.id));
        assert!(!registry.is_current(&owner(), first.id));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_release_only_by_current_holder() {
        let registry = ConnectionRegistry::new();
        let first = registry.register(&owner());
        let second = registry.register(&owner());

        assert!(!registry.release(&owner(), first.id));
        assert_eq!(registry.active_count(), 1);
        assert!(registry.release(&owner(), second.id));
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn test_shutdown_cancels_everyone() {
        let registry = ConnectionRegistry::new();
        let a = registry.register(&owner());
        let b = registry.register(
            &OwnerId::parse("0xeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeee").unwrap(),
        );

        registry.shutdown();
        assert!(a.cancel.is_cancelled());
        assert!(b.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_replaced_connection_leaves_successor_state_alone() {
        let registry = ConnectionRegistry::new();
        let chats: ChatService<NoRepository> = ChatService::in_memory();
        let chat_id = ChatId::parse("live").unwrap();

        let first = registry.register(&owner());
        let second = registry.register(&owner());
        chats.open_chat(&owner(), &chat_id, None).await.unwrap();
        chats
            .put_file(&owner(), &chat_id, "A.sol", "contract A {}", "solidity")
            .await
            .unwrap();

        assert!(!registry.finish(&owner(), first.id, &chats).await);
        assert_eq!(chats.store().list_files(&owner(), &chat_id).unwrap().len(), 1);
        assert_eq!(chats.store().list_chats(&owner())[0].status, ChatStatus::Active);

        assert!(registry.finish(&owner(), second.id, &chats).await);
        assert!(chats.store().list_files(&owner(), &chat_id).unwrap().is_empty());
        assert_eq!(chats.store().list_chats(&owner())[0].status, ChatStatus::Disconnected);
        assert_eq!(registry.active_count(), 0);
    }
}
