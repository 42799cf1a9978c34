//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod chat;
pub mod pool;

pub use chat::SqliteChatRepository;
pub use pool::DatabasePool;
