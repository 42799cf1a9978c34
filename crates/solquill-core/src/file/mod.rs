//! Virtual files: path canonicalization and the per-chat file store.

pub mod canonical;
pub mod store;

pub use canonical::canonical_name;
pub use store::{HISTORY_LIMIT, PutOutcome, VirtualFileStore};
