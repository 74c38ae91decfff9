//! Trusted control plane.
//!
//! These routes are called by the site backend and the media pipeline, never
//! by browsers; deployment keeps them off the public listener. Actor identity
//! arrives in the `x-user-id` header, already authenticated upstream.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{require_user, AppResult, AppState};
use stagecast_core::models::{Role, RoomId, StudioId, UserId};

/// Live signal request from the media pipeline
#[derive(Debug, Deserialize)]
pub struct SetLiveRequest {
    pub live: bool,
}

#[derive(Debug, Serialize)]
pub struct SetLiveResponse {
    pub seq: u64,
}

#[derive(Debug, Deserialize)]
pub struct CreateStudioRequest {
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Serialize)]
pub struct StudioResponse {
    pub id: String,
    pub name: String,
    pub owner_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct RoomResponse {
    pub id: String,
    pub studio_id: String,
    pub name: String,
    pub number: u32,
}

#[derive(Debug, Deserialize)]
pub struct SetRoleRequest {
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Serialize)]
pub struct MembershipResponse {
    pub studio_id: String,
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct TransferOwnershipRequest {
    pub new_owner_id: String,
}

/// Set a room's live status
///
/// POST /internal/rooms/:room_id/live
pub async fn set_live(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    Json(req): Json<SetLiveRequest>,
) -> AppResult<Json<SetLiveResponse>> {
    let room_id = RoomId::from_string(room_id);
    let seq = state.ingress.stream_status(&room_id, req.live)?;
    Ok(Json(SetLiveResponse { seq }))
}

/// Remove a room, closing every open viewer stream
///
/// DELETE /internal/rooms/:room_id
pub async fn remove_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<axum::http::StatusCode> {
    let actor = require_user(&headers)?;
    let room_id = RoomId::from_string(room_id);
    state.ingress.remove_room(&room_id, &actor)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}

/// Create a studio; the given user becomes its owner
///
/// POST /internal/studios
pub async fn create_studio(
    State(state): State<AppState>,
    Json(req): Json<CreateStudioRequest>,
) -> AppResult<Json<StudioResponse>> {
    let studio = state
        .directory
        .create_studio(req.name, UserId::from_string(req.owner_id))?;
    Ok(Json(StudioResponse {
        id: studio.id.as_str().to_string(),
        name: studio.name,
        owner_id: studio.owner.as_str().to_string(),
    }))
}

/// Create a room within a studio
///
/// POST /internal/studios/:studio_id/rooms
pub async fn create_room(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<CreateRoomRequest>,
) -> AppResult<Json<RoomResponse>> {
    let actor = require_user(&headers)?;
    let studio_id = StudioId::from_string(studio_id);
    let room = state.directory.create_room(&studio_id, req.name, &actor)?;
    Ok(Json(RoomResponse {
        id: room.id.as_str().to_string(),
        studio_id: room.studio_id.as_str().to_string(),
        name: room.name,
        number: room.number,
    }))
}

/// Assign a member role (below Owner)
///
/// PUT /internal/studios/:studio_id/members
pub async fn set_role(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<SetRoleRequest>,
) -> AppResult<Json<MembershipResponse>> {
    let actor = require_user(&headers)?;
    let studio_id = StudioId::from_string(studio_id);
    let membership = state.directory.set_role(
        &studio_id,
        &actor,
        UserId::from_string(req.user_id),
        req.role,
    )?;
    Ok(Json(MembershipResponse {
        studio_id: membership.studio_id.as_str().to_string(),
        user_id: membership.user_id.as_str().to_string(),
        role: membership.role,
    }))
}

/// Transfer studio ownership
///
/// POST /internal/studios/:studio_id/transfer
pub async fn transfer_ownership(
    State(state): State<AppState>,
    Path(studio_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<TransferOwnershipRequest>,
) -> AppResult<axum::http::StatusCode> {
    let actor = require_user(&headers)?;
    let studio_id = StudioId::from_string(studio_id);
    state.directory.transfer_ownership(
        &studio_id,
        &actor,
        UserId::from_string(req.new_owner_id),
    )?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
