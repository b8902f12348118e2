//! Redis history backend.
//!
//! Each pair log is a Redis list under the key `chat:{lo}:{hi}`. Appends
//! RPUSH the JSON-encoded record and reset the key's TTL, which is what
//! makes the retention window sliding: the timer restarts on every write and
//! the whole key vanishes together when it finally elapses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tracing::warn;

use super::ChatHistory;
use crate::models::{ChatKey, MessageRecord};

#[derive(Clone)]
pub struct RedisHistory {
    conn: ConnectionManager,
    retention_secs: i64,
}

impl RedisHistory {
    /// Connect to Redis. Supports both redis:// and rediss:// URLs; the
    /// connection manager reconnects automatically.
    pub async fn connect(url: &str, retention: Duration) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid Redis URL")?;
        let conn = ConnectionManager::new(client)
            .await
            .context("failed to connect to Redis")?;
        Ok(Self {
            conn,
            retention_secs: retention.as_secs() as i64,
        })
    }
}

#[async_trait]
impl ChatHistory for RedisHistory {
    async fn append(&self, key: ChatKey, record: &MessageRecord) -> Result<()> {
        let payload = serde_json::to_string(record).context("failed to encode message record")?;
        let key = key.to_string();
        let mut conn = self.conn.clone();
        let _: i64 = conn
            .rpush(&key, payload)
            .await
            .context("RPUSH to history key failed")?;
        let _: bool = conn
            .expire(&key, self.retention_secs)
            .await
            .context("EXPIRE on history key failed")?;
        Ok(())
    }

    async fn read(&self, key: ChatKey, limit: usize) -> Result<Vec<MessageRecord>> {
        let key = key.to_string();
        let mut conn = self.conn.clone();
        let raw: Vec<String> = conn
            .lrange(&key, -(limit as isize), -1)
            .await
            .context("LRANGE on history key failed")?;

        let mut records = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<MessageRecord>(&entry) {
                Ok(record) => records.push(record),
                Err(error) => {
                    warn!(key = %key, %error, "Skipping unparseable history entry");
                }
            }
        }
        Ok(records)
    }

    async fn count(&self, key: ChatKey) -> Result<usize> {
        let mut conn = self.conn.clone();
        let len: i64 = conn
            .llen(key.to_string())
            .await
            .context("LLEN on history key failed")?;
        Ok(len.max(0) as usize)
    }

    async fn clear(&self, key: ChatKey) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn
            .del(key.to_string())
            .await
            .context("DEL on history key failed")?;
        Ok(removed > 0)
    }
}
