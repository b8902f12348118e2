//! In-memory history backend for tests and bootstrap runs.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;

use super::ChatHistory;
use crate::models::{ChatKey, MessageRecord};

#[derive(Debug, Default)]
struct PairLog {
    records: Vec<MessageRecord>,
    /// Epoch second past which the whole key is considered gone.
    expires_at: i64,
}

/// Mutex-guarded map of pair logs with lazy whole-key expiry: an expired key
/// is dropped wholesale the next time it is touched, mirroring how the Redis
/// backend's keys simply vanish when their TTL elapses.
#[derive(Debug)]
pub struct MemoryHistory {
    retention_secs: i64,
    entries: Mutex<HashMap<ChatKey, PairLog>>,
}

impl MemoryHistory {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention_secs: retention.as_secs() as i64,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn append_at(&self, key: ChatKey, record: &MessageRecord, now: i64) {
        let mut entries = self.entries.lock();
        let log = entries.entry(key).or_default();
        if !log.records.is_empty() && now >= log.expires_at {
            log.records.clear();
        }
        log.records.push(record.clone());
        log.expires_at = now + self.retention_secs;
    }

    fn read_at(&self, key: ChatKey, limit: usize, now: i64) -> Vec<MessageRecord> {
        let mut entries = self.entries.lock();
        if let Some(log) = entries.get(&key) {
            if now < log.expires_at {
                let start = log.records.len().saturating_sub(limit);
                return log.records[start..].to_vec();
            }
        }
        entries.remove(&key);
        Vec::new()
    }

    fn count_at(&self, key: ChatKey, now: i64) -> usize {
        let mut entries = self.entries.lock();
        if let Some(log) = entries.get(&key) {
            if now < log.expires_at {
                return log.records.len();
            }
        }
        entries.remove(&key);
        0
    }

    fn clear_at(&self, key: ChatKey, now: i64) -> bool {
        let mut entries = self.entries.lock();
        match entries.remove(&key) {
            // An expired leftover counts as already gone.
            Some(log) => now < log.expires_at,
            None => false,
        }
    }
}

#[async_trait]
impl ChatHistory for MemoryHistory {
    async fn append(&self, key: ChatKey, record: &MessageRecord) -> Result<()> {
        self.append_at(key, record, Self::now());
        Ok(())
    }

    async fn read(&self, key: ChatKey, limit: usize) -> Result<Vec<MessageRecord>> {
        Ok(self.read_at(key, limit, Self::now()))
    }

    async fn count(&self, key: ChatKey) -> Result<usize> {
        Ok(self.count_at(key, Self::now()))
    }

    async fn clear(&self, key: ChatKey) -> Result<bool> {
        Ok(self.clear_at(key, Self::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RETENTION: Duration = Duration::from_secs(1800);

    fn record(from: i64, to: i64, message: &str, timestamp: i64) -> MessageRecord {
        MessageRecord {
            from,
            from_username: None,
            to,
            message: message.to_string(),
            timestamp,
        }
    }

    #[test]
    fn read_preserves_insertion_order() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(1, 2);

        store.append_at(key, &record(1, 2, "first", 100), 100);
        store.append_at(key, &record(2, 1, "second", 101), 101);

        let messages = store.read_at(key, 50, 102);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "first");
        assert_eq!(messages[1].message, "second");
    }

    #[test]
    fn read_caps_at_most_recent_limit() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(1, 2);

        for i in 0..5 {
            store.append_at(key, &record(1, 2, &format!("m{i}"), 100 + i), 100 + i);
        }

        let messages = store.read_at(key, 2, 110);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].message, "m3");
        assert_eq!(messages[1].message, "m4");
    }

    #[test]
    fn missing_key_reads_empty() {
        let store = MemoryHistory::new(RETENTION);
        assert!(store.read_at(ChatKey::new(8, 9), 50, 100).is_empty());
        assert_eq!(store.count_at(ChatKey::new(8, 9), 100), 0);
    }

    #[test]
    fn key_expires_wholesale_after_retention() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(1, 2);

        store.append_at(key, &record(1, 2, "old", 100), 100);

        let expiry = 100 + RETENTION.as_secs() as i64;
        assert_eq!(store.count_at(key, expiry - 1), 1);
        assert!(store.read_at(key, 50, expiry).is_empty());
        assert_eq!(store.count_at(key, expiry), 0);
    }

    #[test]
    fn append_slides_the_expiration_window() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(1, 2);
        let retention = RETENTION.as_secs() as i64;

        store.append_at(key, &record(1, 2, "first", 100), 100);
        // A later write pushes the whole key's expiry out; the first record
        // outlives its own original window.
        store.append_at(key, &record(2, 1, "second", 100 + retention - 1), 100 + retention - 1);

        let messages = store.read_at(key, 50, 100 + retention + 1);
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn append_after_expiry_starts_a_fresh_log() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(1, 2);
        let retention = RETENTION.as_secs() as i64;

        store.append_at(key, &record(1, 2, "stale", 100), 100);
        store.append_at(key, &record(1, 2, "fresh", 200 + retention), 200 + retention);

        let messages = store.read_at(key, 50, 201 + retention);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].message, "fresh");
    }

    #[test]
    fn clear_removes_key_and_reports_it() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(3, 4);

        store.append_at(key, &record(3, 4, "bye", 100), 100);
        assert!(store.clear_at(key, 101));
        assert!(!store.clear_at(key, 102));
        assert_eq!(store.count_at(key, 103), 0);
    }

    #[test]
    fn clear_of_expired_key_reports_nothing_removed() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(3, 4);
        let retention = RETENTION.as_secs() as i64;

        store.append_at(key, &record(3, 4, "bye", 100), 100);
        assert!(!store.clear_at(key, 100 + retention));
    }

    #[tokio::test]
    async fn trait_surface_uses_wall_clock() {
        let store = MemoryHistory::new(RETENTION);
        let key = ChatKey::new(5, 6);

        store.append(key, &record(5, 6, "hello", 100)).await.unwrap();
        assert_eq!(store.count(key).await.unwrap(), 1);
        assert_eq!(store.read(key, 50).await.unwrap()[0].message, "hello");
        assert!(store.clear(key).await.unwrap());
    }
}
