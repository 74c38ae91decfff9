//! Reaction submission endpoint.
//!
//! Reactions are broadcast-and-forget: the response carries only the seq the
//! hub stamped on the fan-out.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{credentials_from, AppResult, AppState};
use stagecast_core::models::RoomId;

/// Send reaction request
#[derive(Debug, Deserialize)]
pub struct PostReactionRequest {
    pub emote: String,
    /// Guest access code, when not authenticated as a member
    pub code: Option<String>,
    /// Guest display name
    pub name: Option<String>,
}

/// Send reaction response
#[derive(Debug, Serialize)]
pub struct PostReactionResponse {
    pub seq: u64,
}

/// Fire a reaction in a room
///
/// POST /api/rooms/:room_id/reactions
pub async fn post_reaction(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<PostReactionRequest>,
) -> AppResult<Json<PostReactionResponse>> {
    let room_id = RoomId::from_string(room_id);
    let credentials = credentials_from(&headers, req.code, req.name)?;

    let seq = state
        .ingress
        .post_reaction(&room_id, &credentials, &req.emote)?;

    Ok(Json(PostReactionResponse { seq }))
}
