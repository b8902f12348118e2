//! Message history store: append-only per-pair logs with a sliding
//! retention window.
//!
//! The interface is deliberately minimal so backends are drop-in: the
//! in-memory store backs tests and bootstrap runs, the Redis store backs
//! production. Missing or expired keys are a normal state, never an error.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{ChatKey, MessageRecord};

mod memory;
mod redis;

pub use memory::MemoryHistory;
pub use redis::RedisHistory;

#[async_trait]
pub trait ChatHistory: Send + Sync {
    /// Append a record to the key's log and refresh the key's expiration to
    /// `now + retention` (sliding TTL: the window is measured from the most
    /// recent write, not per message).
    async fn append(&self, key: ChatKey, record: &MessageRecord) -> Result<()>;

    /// Up to the last `limit` records in insertion order, oldest of the
    /// returned window first. Empty for missing or expired keys.
    async fn read(&self, key: ChatKey, limit: usize) -> Result<Vec<MessageRecord>>;

    /// Number of currently stored records; 0 for missing or expired keys.
    async fn count(&self, key: ChatKey) -> Result<usize>;

    /// Drop all records and the key itself. Returns whether anything was
    /// actually removed.
    async fn clear(&self, key: ChatKey) -> Result<bool>;
}
