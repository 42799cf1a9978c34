//! SQLite chat repository implementation.
//!
//! Each chat is stored as one JSON document in `chat_snapshots`, next to the
//! columns needed to list an owner's chats without decoding every body.

use chrono::{DateTime, Utc};
use sqlx::Row;

use solquill_core::chat::{Chat, ChatRepository};
use solquill_types::error::RepositoryError;
use solquill_types::identity::{ChatId, OwnerId};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn decode(row: &sqlx::sqlite::SqliteRow) -> Result<Chat, RepositoryError> {
    let body: String = row
        .try_get("body")
        .map_err(|e| RepositoryError::Query(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| RepositoryError::Serialization(e.to_string()))
}

impl ChatRepository for SqliteChatRepository {
    async fn load(&self, chat_id: &ChatId) -> Result<Option<Chat>, RepositoryError> {
        let row = sqlx::query("SELECT body FROM chat_snapshots WHERE chat_id = ?")
            .bind(chat_id.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.as_ref().map(decode).transpose()
    }

    async fn save(&self, chat: &Chat) -> Result<(), RepositoryError> {
        let body =
            serde_json::to_string(chat).map_err(|e| RepositoryError::Serialization(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO chat_snapshots (chat_id, owner, name, body, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT(chat_id) DO UPDATE SET
                   name = excluded.name,
                   body = excluded.body,
                   updated_at = excluded.updated_at
               WHERE chat_snapshots.owner = excluded.owner"#,
        )
        .bind(chat.id.as_str())
        .bind(chat.owner.as_str())
        .bind(&chat.name)
        .bind(body)
        .bind(format_datetime(&chat.created_at))
        .bind(format_datetime(&Utc::now()))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn delete(&self, chat_id: &ChatId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM chat_snapshots WHERE chat_id = ?")
            .bind(chat_id.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(())
    }

    async fn list_for_owner(&self, owner: &OwnerId) -> Result<Vec<Chat>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT body FROM chat_snapshots WHERE owner = ? ORDER BY created_at ASC, chat_id ASC",
        )
        .bind(owner.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter().map(decode).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solquill_types::chat::Message;

    fn owner() -> OwnerId {
        OwnerId::parse("0x1111111111111111111111111111111111111111").unwrap()
    }

    async fn repository() -> (tempfile::TempDir, SqliteChatRepository) {
        let dir = tempfile::tempdir().unwrap();
        let pool = DatabasePool::open_in(dir.path()).await.unwrap();
        (dir, SqliteChatRepository::new(pool))
    }

    fn sample_chat(name: &str) -> Chat {
        let mut chat = Chat::new(owner(), ChatId::generate(), name.to_string());
        chat.messages.push(Message::user("write a token"));
        chat.files.put("contracts/Token.sol", "contract Token {}", "solidity");
        chat.files.put("contracts/Token.sol", "contract Token { uint x; }", "solidity");
        chat
    }

    #[tokio::test]
    async fn test_save_and_load_keeps_files_and_history() {
        let (_dir, repo) = repository().await;
        let chat = sample_chat("Chat 1");
        repo.save(&chat).await.unwrap();

        let loaded = repo.load(&chat.id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "Chat 1");
        assert_eq!(loaded.owner, owner());
        assert_eq!(loaded.messages.len(), 1);
        assert_eq!(
            loaded.files.current("contracts/Token.sol").unwrap().content,
            "contract Token { uint x; }"
        );
        assert_eq!(loaded.files.history("contracts/Token.sol").len(), 1);
    }

    #[tokio::test]
    async fn test_save_twice_replaces() {
        let (_dir, repo) = repository().await;
        let mut chat = sample_chat("Chat 1");
        repo.save(&chat).await.unwrap();

        chat.messages.push(Message::ai("done", "message"));
        repo.save(&chat).await.unwrap();

        let loaded = repo.load(&chat.id).await.unwrap().unwrap();
        assert_eq!(loaded.messages.len(), 2);
        assert_eq!(repo.list_for_owner(&owner()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_never_reassigns_owner() {
        let (_dir, repo) = repository().await;
        let chat = sample_chat("Chat 1");
        repo.save(&chat).await.unwrap();

        let other = OwnerId::parse("0x2222222222222222222222222222222222222222").unwrap();
        repo.save(&Chat::new(other.clone(), chat.id.clone(), "Taken".to_string()))
            .await
            .unwrap();

        let loaded = repo.load(&chat.id).await.unwrap().unwrap();
        assert_eq!(loaded.owner, owner());
        assert_eq!(loaded.name, "Chat 1");
        assert_eq!(loaded.messages.len(), 1);
        assert!(repo.list_for_owner(&other).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let (_dir, repo) = repository().await;
        assert!(repo.load(&ChatId::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (_dir, repo) = repository().await;
        let chat = sample_chat("Chat 1");
        repo.save(&chat).await.unwrap();

        repo.delete(&chat.id).await.unwrap();
        repo.delete(&chat.id).await.unwrap();
        assert!(repo.load(&chat.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_for_owner_filters_by_owner() {
        let (_dir, repo) = repository().await;
        repo.save(&sample_chat("Chat 1")).await.unwrap();
        repo.save(&sample_chat("Chat 2")).await.unwrap();

        let other = OwnerId::parse("0x2222222222222222222222222222222222222222").unwrap();
        repo.save(&Chat::new(other.clone(), ChatId::generate(), "Chat 1".to_string()))
            .await
            .unwrap();

        let mine = repo.list_for_owner(&owner()).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|c| c.owner == owner()));
        assert_eq!(repo.list_for_owner(&other).await.unwrap().len(), 1);
    }
}
