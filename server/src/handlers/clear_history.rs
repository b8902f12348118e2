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
pub struct ClearHistoryOutput {
    pub cleared: bool,
}

/// Remove the whole history between two users.
/// DELETE /api/chat/history?user_id=&other_user=
#[tracing::instrument(skip(chat))]
pub async fn clear_history(
    State(chat): State<Arc<ChatService>>,
    Query(params): Query<PairParams>,
) -> Result<Json<ClearHistoryOutput>, StatusCode> {
    let cleared = chat
        .clear_chat_history(params.user_id, params.other_user)
        .await
        .map_err(|e| {
            error!("Failed to clear chat history: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ClearHistoryOutput { cleared }))
}
