//! ChatRepository trait definition.
//!
//! Persists a chat's full representation (transcript, files, history) as one
//! record keyed by chat id.

use solquill_types::error::RepositoryError;
use solquill_types::identity::{ChatId, OwnerId};

use super::store::Chat;

/// Repository trait for chat snapshot persistence.
///
/// Implementations live in solquill-infra (e.g., `SqliteChatRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait ChatRepository: Send + Sync {
    /// Load a chat by id, or `None` if it was never saved.
    fn load(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<Option<Chat>, RepositoryError>> + Send;

    /// Insert or replace a chat.
    fn save(
        &self,
        chat: &Chat,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Delete a chat. Deleting an absent chat is not an error.
    fn delete(
        &self,
        chat_id: &ChatId,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// All chats of one owner, oldest first.
    fn list_for_owner(
        &self,
        owner: &OwnerId,
    ) -> impl std::future::Future<Output = Result<Vec<Chat>, RepositoryError>> + Send;
}
