//! Chat submission endpoint.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{credentials_from, AppResult, AppState};
use stagecast_core::models::RoomId;

/// Send chat message request
#[derive(Debug, Deserialize)]
pub struct PostChatRequest {
    pub text: String,
    /// Guest access code, when not authenticated as a member
    pub code: Option<String>,
    /// Guest display name
    pub name: Option<String>,
}

/// Send chat message response
#[derive(Debug, Serialize)]
pub struct PostChatResponse {
    pub room_id: String,
    pub author: String,
    pub text: String,
    pub seq: u64,
    pub timestamp: String,
}

/// Post a chat message to a room
///
/// POST /api/rooms/:room_id/chat
pub async fn post_chat(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PostChatRequest>,
) -> AppResult<Json<PostChatResponse>> {
    let room_id = RoomId::from_string(room_id);
    let credentials = credentials_from(&headers, req.code, req.name)?;

    let message = state.ingress.post_chat(&room_id, &credentials, req.text)?;

    Ok(Json(PostChatResponse {
        room_id: message.room_id.as_str().to_string(),
        author: message.author,
        text: message.text,
        seq: message.seq,
        timestamp: message.timestamp.to_rfc3339(),
    }))
}
