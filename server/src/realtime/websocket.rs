//! WebSocket handler for the live chat channel.
//!
//! The handshake carries identity in the query string rather than a cookie:
//! the browser WebSocket handshake cannot reliably carry cookie headers, so
//! the client passes `user_id` and `other_user` explicitly. Each failure
//! mode closes the socket with its own machine-readable code; a connection
//! that authenticates is registered with the connection registry and relays
//! inbound text into the delivery engine until it goes away.

use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::delivery::{ChatService, SendOutcome};
use crate::models::ErrorFrame;
use crate::registry::Session;

/// Close codes for handshake failures, one per cause.
pub const CLOSE_MISSING_USER: u16 = 4001;
pub const CLOSE_INVALID_USER: u16 = 4002;
pub const CLOSE_MISSING_PEER: u16 = 4003;
pub const CLOSE_INVALID_PEER: u16 = 4004;

/// Error-frame kinds emitted on the live channel.
const ERR_BLOCKED: &str = "blocked";
const ERR_TOO_LONG: &str = "message_too_long";
const ERR_DELIVERY_FAILED: &str = "delivery_failed";

#[derive(Debug, Deserialize)]
pub struct ChatSocketQuery {
    pub user_id: Option<String>,
    pub other_user: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HandshakeError {
    #[error("missing user_id parameter")]
    MissingUser,
    #[error("user_id is not an integer")]
    InvalidUser,
    #[error("missing other_user parameter")]
    MissingPeer,
    #[error("other_user is not an integer")]
    InvalidPeer,
}

impl HandshakeError {
    pub fn close_code(&self) -> u16 {
        match self {
            Self::MissingUser => CLOSE_MISSING_USER,
            Self::InvalidUser => CLOSE_INVALID_USER,
            Self::MissingPeer => CLOSE_MISSING_PEER,
            Self::InvalidPeer => CLOSE_INVALID_PEER,
        }
    }
}

/// Extract `(user_id, peer_id)` from the handshake query. An empty value is
/// treated the same as an absent parameter.
fn parse_identity(query: &ChatSocketQuery) -> Result<(i64, i64), HandshakeError> {
    let user_id = match query.user_id.as_deref() {
        None | Some("") => return Err(HandshakeError::MissingUser),
        Some(raw) => raw.parse().map_err(|_| HandshakeError::InvalidUser)?,
    };
    let peer_id = match query.other_user.as_deref() {
        None | Some("") => return Err(HandshakeError::MissingPeer),
        Some(raw) => raw.parse().map_err(|_| HandshakeError::InvalidPeer)?,
    };
    Ok((user_id, peer_id))
}

/// WebSocket route for the live chat channel.
/// GET /ws/chat?user_id=<i64>&other_user=<i64> (WebSocket upgrade)
pub async fn chat_ws(
    ws: WebSocketUpgrade,
    State(chat): State<Arc<ChatService>>,
    State(config): State<Arc<Config>>,
    Query(query): Query<ChatSocketQuery>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, chat, config, query))
}

async fn handle_socket(
    socket: WebSocket,
    chat: Arc<ChatService>,
    config: Arc<Config>,
    query: ChatSocketQuery,
) {
    let (user_id, peer_id) = match parse_identity(&query) {
        Ok(ids) => ids,
        Err(reason) => {
            warn!(code = reason.close_code(), %reason, "Rejecting chat handshake");
            close_with(socket, reason).await;
            return;
        }
    };

    let (session, mut outbound_rx) = Session::channel();
    chat.connect(user_id, session.clone());
    info!(user_id, peer_id, session = session.id(), "Chat session registered");

    let (ws_sender, mut ws_receiver) = socket.split();
    // Shared between the writer and heartbeat tasks.
    let sender = Arc::new(Mutex::new(ws_sender));

    // Drain the session channel into the socket.
    let writer_sender = sender.clone();
    let mut write_task = tokio::spawn(async move {
        while let Some(text) = outbound_rx.recv().await {
            let mut guard = writer_sender.lock().await;
            if guard.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Periodic ping to detect stale connections.
    let heartbeat_sender = sender.clone();
    let ping_interval = config.ws_ping_interval;
    let mut heartbeat_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(ping_interval);
        loop {
            interval.tick().await;
            let mut guard = heartbeat_sender.lock().await;
            if guard.send(Message::Ping(vec![].into())).await.is_err() {
                debug!("Heartbeat ping failed, connection likely closed");
                break;
            }
        }
    });

    // Inbound loop: strictly sequential, preserving per-session order.
    let inbound_chat = chat.clone();
    let inbound_session = session.clone();
    let max_message_length = config.max_message_length;
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = ws_receiver.next().await {
            match message {
                Message::Text(text) => {
                    relay_inbound(
                        &inbound_chat,
                        &inbound_session,
                        user_id,
                        peer_id,
                        text.as_str(),
                        max_message_length,
                    )
                    .await;
                }
                Message::Close(_) => break,
                // Pong replies are handled by axum; binary frames are not
                // part of the chat protocol.
                Message::Ping(_) | Message::Pong(_) | Message::Binary(_) => {}
            }
        }
    });

    // Any task finishing tears down the connection.
    tokio::select! {
        _ = (&mut write_task) => {
            recv_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut recv_task) => {
            write_task.abort();
            heartbeat_task.abort();
        }
        _ = (&mut heartbeat_task) => {
            write_task.abort();
            recv_task.abort();
        }
    }

    // Unconditional cleanup: every exit path lands here.
    chat.disconnect(user_id, &session);
    info!(user_id, session = session.id(), "Chat session closed");
}

/// Forward one inbound text frame to the delivery engine against the peer
/// fixed at connect time. Gate rejections and send failures draw an error
/// frame, never a close: one failed send must not kill the connection.
async fn relay_inbound(
    chat: &ChatService,
    session: &Session,
    user_id: i64,
    peer_id: i64,
    raw: &str,
    max_message_length: usize,
) {
    let text = raw.trim();
    if text.is_empty() {
        return;
    }
    if text.chars().count() > max_message_length {
        send_error_frame(session, ERR_TOO_LONG, "Message exceeds the maximum allowed length");
        return;
    }

    match chat.deliver(text, peer_id, user_id).await {
        SendOutcome::Delivered => {}
        SendOutcome::Blocked => {
            send_error_frame(session, ERR_BLOCKED, "Messaging between these users is blocked");
        }
        SendOutcome::Failed => {
            send_error_frame(session, ERR_DELIVERY_FAILED, "The message could not be delivered");
        }
    }
}

fn send_error_frame(session: &Session, kind: &str, message: &str) {
    let frame = ErrorFrame::new(kind, message);
    // SAFETY: ErrorFrame is two strings; serialization cannot fail.
    let payload = serde_json::to_string(&frame).expect("BUG: failed to serialize error frame");
    if session.send_text(&payload).is_err() {
        debug!(session = session.id(), "Session closed before error frame was queued");
    }
}

async fn close_with(mut socket: WebSocket, reason: HandshakeError) {
    let frame = CloseFrame {
        code: reason.close_code(),
        reason: reason.to_string().into(),
    };
    let _ = socket.send(Message::Close(Some(frame))).await;
}
