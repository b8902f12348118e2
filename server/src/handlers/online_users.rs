use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::delivery::ChatService;

#[derive(Debug, Serialize)]
pub struct OnlineUsersOutput {
    pub users: Vec<i64>,
}

/// Ids of all users with at least one live chat session.
/// GET /api/chat/online
#[tracing::instrument(skip(chat))]
pub async fn online_users(State(chat): State<Arc<ChatService>>) -> Json<OnlineUsersOutput> {
    let mut users = chat.online_users();
    users.sort_unstable();
    Json(OnlineUsersOutput { users })
}
