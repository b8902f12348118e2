use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::error;

use crate::delivery::ChatService;
use crate::models::MessageRecord;

#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    pub user_id: i64,
    pub other_user: i64,
    pub limit: Option<usize>,
}

/// Message history between two users, most-recent window in insertion order.
/// GET /api/chat/history?user_id=&other_user=&limit=
#[tracing::instrument(skip(chat))]
pub async fn get_history(
    State(chat): State<Arc<ChatService>>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Vec<MessageRecord>>, StatusCode> {
    let history = chat
        .get_history(params.user_id, params.other_user, params.limit)
        .await
        .map_err(|e| {
            error!("Failed to read chat history: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(history))
}
