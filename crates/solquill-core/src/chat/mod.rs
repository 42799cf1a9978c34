//! Chat sessions: the owner-partitioned store, the persistence port and the
//! service that keeps the two in step.

pub mod repository;
pub mod service;
pub mod store;

pub use repository::ChatRepository;
pub use service::ChatService;
pub use store::{Chat, ChatStore, SyncOutcome};
