//! Delivery engine: gate, persist, then fan out to every live session of
//! both parties.

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::blocks::BlockGate;
use crate::directory::UserDirectory;
use crate::history::ChatHistory;
use crate::models::{ChatKey, DeliveryFrame, MessageRecord};
use crate::registry::{ConnectionRegistry, Session};

/// Outcome of one delivery attempt. The produced interface collapses this
/// to a boolean; the session handler uses the full variant to pick the
/// error-frame kind it reports to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// The pair is blocked. Expected state, not an error: nothing was
    /// written and nothing was sent.
    Blocked,
    /// A gate or store failure prevented the send.
    Failed,
}

/// The chat service owns the connection registry and coordinates every
/// message between the block gate, the history store, and live fan-out.
pub struct ChatService {
    registry: ConnectionRegistry,
    history: Arc<dyn ChatHistory>,
    directory: Option<Arc<dyn UserDirectory>>,
    gate: BlockGate,
    default_history_limit: usize,
}

impl ChatService {
    pub fn new(
        history: Arc<dyn ChatHistory>,
        directory: Option<Arc<dyn UserDirectory>>,
        default_history_limit: usize,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            history,
            gate: BlockGate::new(directory.clone()),
            directory,
            default_history_limit,
        }
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Register a session for a user; the user becomes visible to presence
    /// queries.
    pub fn connect(&self, user_id: i64, session: Session) {
        self.registry.register(user_id, session);
        metrics::increment_gauge!("chat_active_sessions", 1.0);
        metrics::counter!("chat_connections_total", 1);
    }

    /// Remove a session. Idempotent; the last removal takes the user
    /// offline.
    pub fn disconnect(&self, user_id: i64, session: &Session) {
        self.registry.remove(user_id, session);
        metrics::decrement_gauge!("chat_active_sessions", 1.0);
    }

    pub fn online_users(&self) -> Vec<i64> {
        self.registry.online_users()
    }

    /// Produced interface: true only when gate, persist, and fan-out all
    /// started cleanly. Per-session transmission failures do not flip this.
    pub async fn send_personal_message(&self, text: &str, to_user: i64, from_user: i64) -> bool {
        matches!(
            self.deliver(text, to_user, from_user).await,
            SendOutcome::Delivered
        )
    }

    /// Gate → persist → fan out. Persistence strictly precedes fan-out so a
    /// reconnecting session's next history read always includes the message
    /// even when its live delivery failed.
    pub async fn deliver(&self, text: &str, to_user: i64, from_user: i64) -> SendOutcome {
        let blocked = match self.gate.is_blocked(from_user, to_user).await {
            Ok(blocked) => blocked,
            Err(error) => {
                error!(from_user, to_user, %error, "Block check failed");
                metrics::counter!("chat_send_failures_total", 1);
                return SendOutcome::Failed;
            }
        };
        if blocked {
            debug!(from_user, to_user, "Send rejected by block policy");
            metrics::counter!("chat_messages_blocked_total", 1);
            return SendOutcome::Blocked;
        }

        let record = MessageRecord {
            from: from_user,
            from_username: self.resolve_username(from_user).await,
            to: to_user,
            message: text.to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        };

        let key = ChatKey::new(from_user, to_user);
        if let Err(error) = self.history.append(key, &record).await {
            error!(from_user, to_user, %error, "Failed to persist message");
            metrics::counter!("chat_send_failures_total", 1);
            return SendOutcome::Failed;
        }

        let frame = DeliveryFrame::from_record(&record);
        // SAFETY: DeliveryFrame is a plain struct of integers and strings,
        // so serialization can only fail on a serde_json bug.
        let payload =
            serde_json::to_string(&frame).expect("BUG: failed to serialize delivery frame");

        self.fan_out(to_user, &payload);
        self.fan_out(from_user, &payload);

        metrics::counter!("chat_messages_sent_total", 1);
        SendOutcome::Delivered
    }

    /// Best-effort username resolution; a lookup failure leaves the field
    /// unset rather than aborting the send.
    async fn resolve_username(&self, user_id: i64) -> Option<String> {
        let directory = self.directory.as_ref()?;
        match directory.get_user(user_id).await {
            Ok(user) => user.map(|u| u.username),
            Err(error) => {
                warn!(user_id, %error, "User lookup failed, sending without username");
                None
            }
        }
    }

    /// Deliver a payload to a snapshot of the user's sessions, pruning any
    /// whose channel has gone dead. A broken session never blocks delivery
    /// to the remaining ones.
    fn fan_out(&self, user_id: i64, payload: &str) {
        for session in self.registry.sessions_of(user_id) {
            if session.send_text(payload).is_err() {
                warn!(user_id, session = session.id(), "Pruning dead session during fan-out");
                self.registry.remove(user_id, &session);
                metrics::counter!("chat_sessions_pruned_total", 1);
            }
        }
    }

    /// History between two users, capped at `limit` (default when `None`).
    pub async fn get_history(
        &self,
        user_a: i64,
        user_b: i64,
        limit: Option<usize>,
    ) -> anyhow::Result<Vec<MessageRecord>> {
        let limit = limit.unwrap_or(self.default_history_limit);
        self.history.read(ChatKey::new(user_a, user_b), limit).await
    }

    pub async fn get_message_count(&self, user_a: i64, user_b: i64) -> anyhow::Result<usize> {
        self.history.count(ChatKey::new(user_a, user_b)).await
    }

    pub async fn clear_chat_history(&self, user_a: i64, user_b: i64) -> anyhow::Result<bool> {
        let cleared = self.history.clear(ChatKey::new(user_a, user_b)).await?;
        if cleared {
            info!(user_a, user_b, "Chat history cleared");
        }
        Ok(cleared)
    }

    pub async fn is_blocked(&self, user_a: i64, user_b: i64) -> anyhow::Result<bool> {
        self.gate.is_blocked(user_a, user_b).await
    }

    pub async fn who_blocked(
        &self,
        user_a: i64,
        user_b: i64,
    ) -> anyhow::Result<Option<(i64, i64)>> {
        self.gate.who_blocked(user_a, user_b).await
    }
}
