use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use super::PairParams;
use crate::delivery::ChatService;

#[derive(Debug, Serialize)]
pub struct MessageCountOutput {
    pub count: usize,
}

/// Number of stored messages between two users.
/// GET /api/chat/history/count?user_id=&other_user=
#[tracing::instrument(skip(chat))]
pub async fn message_count(
    State(chat): State<Arc<ChatService>>,
    Query(params): Query<PairParams>,
) -> Result<Json<MessageCountOutput>, StatusCode> {
    let count = chat
        .get_message_count(params.user_id, params.other_user)
        .await
        .map_err(|e| {
            error!("Failed to count chat history: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(MessageCountOutput { count }))
}
