//! User directory collaborator: lookup and block relationships.
//!
//! The chat core never stores users or block rows itself; it consults this
//! narrow interface. The in-memory implementation backs tests and bootstrap
//! runs where no external user service is wired up.

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize)]
pub struct UserInfo {
    pub id: i64,
    pub username: String,
    pub email: String,
}

/// External user-relationship collaborator.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, id: i64) -> Result<Option<UserInfo>>;

    /// True if either user has blocked the other.
    async fn is_blocked(&self, a: i64, b: i64) -> Result<bool>;

    /// Directional view of a block between two users: `(blocker, blocked)`,
    /// or `None` when neither direction is blocked. Consumed by the
    /// presentation layer only.
    async fn who_blocked(&self, a: i64, b: i64) -> Result<Option<(i64, i64)>>;
}

#[derive(Debug, Default)]
struct DirectoryState {
    users: HashMap<i64, UserInfo>,
    blocks: HashSet<(i64, i64)>,
}

/// In-memory directory for tests and degraded/bootstrap modes.
#[derive(Debug, Default)]
pub struct MemoryDirectory {
    state: RwLock<DirectoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserInfo) {
        self.state.write().users.insert(user.id, user);
    }

    pub fn block(&self, blocker: i64, blocked: i64) {
        self.state.write().blocks.insert((blocker, blocked));
    }

    pub fn unblock(&self, blocker: i64, blocked: i64) {
        self.state.write().blocks.remove(&(blocker, blocked));
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get_user(&self, id: i64) -> Result<Option<UserInfo>> {
        Ok(self.state.read().users.get(&id).cloned())
    }

    async fn is_blocked(&self, a: i64, b: i64) -> Result<bool> {
        let state = self.state.read();
        Ok(state.blocks.contains(&(a, b)) || state.blocks.contains(&(b, a)))
    }

    async fn who_blocked(&self, a: i64, b: i64) -> Result<Option<(i64, i64)>> {
        let state = self.state.read();
        if state.blocks.contains(&(a, b)) {
            Ok(Some((a, b)))
        } else if state.blocks.contains(&(b, a)) {
            Ok(Some((b, a)))
        } else {
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, name: &str) -> UserInfo {
        UserInfo {
            id,
            username: name.to_string(),
            email: format!("{name}@example.com"),
        }
    }

    #[tokio::test]
    async fn lookup_returns_inserted_user() {
        let dir = MemoryDirectory::new();
        dir.insert_user(user(1, "alice"));

        let found = dir.get_user(1).await.unwrap().unwrap();
        assert_eq!(found.username, "alice");
        assert!(dir.get_user(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn is_blocked_covers_both_directions() {
        let dir = MemoryDirectory::new();
        dir.block(1, 2);

        assert!(dir.is_blocked(1, 2).await.unwrap());
        assert!(dir.is_blocked(2, 1).await.unwrap());
        assert!(!dir.is_blocked(1, 3).await.unwrap());

        dir.unblock(1, 2);
        assert!(!dir.is_blocked(1, 2).await.unwrap());
    }

    #[tokio::test]
    async fn who_blocked_reports_direction() {
        let dir = MemoryDirectory::new();
        dir.block(2, 1);

        assert_eq!(dir.who_blocked(1, 2).await.unwrap(), Some((2, 1)));
        assert_eq!(dir.who_blocked(2, 1).await.unwrap(), Some((2, 1)));
        assert_eq!(dir.who_blocked(1, 3).await.unwrap(), None);
    }
}
