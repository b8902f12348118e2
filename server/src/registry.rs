//! Connection registry: which users currently hold live chat sessions.
//!
//! Maps a user id to the set of sessions open for that user. A user id is
//! present in the map if and only if it has at least one live session;
//! entries emptied by removal are dropped immediately so presence queries
//! never see ghost users.

use dashmap::DashMap;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Returned by [`Session::send_text`] when the owning socket task has gone
/// away and the outbound channel is closed.
#[derive(Debug, thiserror::Error)]
#[error("session channel closed")]
pub struct SessionClosed;

/// Handle to one live bidirectional text channel belonging to a user.
///
/// The handle is cheap to clone; identity is the session id, so a clone and
/// its original compare equal and occupy one slot in the registry. The
/// receiving half returned by [`Session::channel`] is drained by the socket's
/// writer task, and dropping it makes every subsequent `send_text` fail,
/// which is how dead sessions are detected during fan-out.
#[derive(Debug, Clone)]
pub struct Session {
    id: u64,
    outbound: mpsc::UnboundedSender<String>,
}

impl Session {
    /// Create a session handle together with the receiving half of its
    /// outbound channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Self {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            outbound: tx,
        };
        (session, rx)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a text frame for transmission on this session.
    pub fn send_text(&self, text: &str) -> Result<(), SessionClosed> {
        self.outbound
            .send(text.to_string())
            .map_err(|_| SessionClosed)
    }
}

impl PartialEq for Session {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Session {}

impl Hash for Session {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

/// Concurrent map from user id to that user's live sessions.
///
/// Uses [`DashMap`] internally so handlers can register and remove sessions
/// from independent tasks without external synchronization. Cheap to clone
/// via [`Arc`].
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<DashMap<i64, HashSet<Session>>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a session to the user's set, creating the set if absent. The user
    /// becomes visible to presence queries. Never fails.
    pub fn register(&self, user_id: i64, session: Session) {
        self.inner.entry(user_id).or_default().insert(session);
    }

    /// Discard a session from the user's set; the entry is removed entirely
    /// once its last session is gone. Removing an absent session is a no-op.
    pub fn remove(&self, user_id: i64, session: &Session) {
        // Entry API takes the shard write lock up front, so a concurrent
        // register on the same user cannot interleave between the removal
        // and the empty-set check.
        if let dashmap::mapref::entry::Entry::Occupied(mut entry) = self.inner.entry(user_id) {
            entry.get_mut().remove(session);
            if entry.get().is_empty() {
                entry.remove();
                debug!(user_id, "Last session removed, user now offline");
            }
        }
    }

    /// Snapshot of the user's current sessions. Fan-out iterates this copy,
    /// never a live map guard, so sessions can be pruned mid-iteration.
    pub fn sessions_of(&self, user_id: i64) -> Vec<Session> {
        self.inner
            .get(&user_id)
            .map(|sessions| sessions.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Snapshot of all user ids with at least one live session.
    pub fn online_users(&self) -> Vec<i64> {
        self.inner
            .iter()
            .filter(|entry| !entry.value().is_empty())
            .map(|entry| *entry.key())
            .collect()
    }

    /// Total number of live sessions across all users.
    pub fn session_count(&self) -> usize {
        self.inner.iter().map(|entry| entry.value().len()).sum()
    }

    /// Number of users currently online.
    pub fn user_count(&self) -> usize {
        self.inner.len()
    }
}
