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
pub struct BlockStatusOutput {
    pub is_blocked: bool,
    /// Who blocked whom, when a block exists: lets the UI distinguish
    /// "you blocked them" from "they blocked you".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocker: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocked: Option<i64>,
}

/// Block relationship between two users.
/// GET /api/chat/block-status?user_id=&other_user=
#[tracing::instrument(skip(chat))]
pub async fn block_status(
    State(chat): State<Arc<ChatService>>,
    Query(params): Query<PairParams>,
) -> Result<Json<BlockStatusOutput>, StatusCode> {
    let relationship = chat
        .who_blocked(params.user_id, params.other_user)
        .await
        .map_err(|e| {
            error!("Failed to query block status: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let (blocker, blocked) = match relationship {
        Some((blocker, blocked)) => (Some(blocker), Some(blocked)),
        None => (None, None),
    };

    Ok(Json(BlockStatusOutput {
        is_blocked: relationship.is_some(),
        blocker,
        blocked,
    }))
}
