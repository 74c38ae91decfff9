//! Access code lifecycle endpoints: validate (embed redirect flow), issue,
//! and revoke.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use serde::{Deserialize, Serialize};

use crate::http::{require_user, AppResult, AppState};
use stagecast_core::models::RoomId;
use stagecast_core::service::SessionPhase;

/// Validate access code request
#[derive(Debug, Deserialize)]
pub struct ValidateCodeRequest {
    pub code: String,
}

/// Validate access code response
#[derive(Debug, Serialize)]
pub struct ValidateCodeResponse {
    pub room_id: String,
    /// "active" or "draining"
    pub phase: &'static str,
}

/// Issue access code response
#[derive(Debug, Serialize)]
pub struct IssueCodeResponse {
    pub code: String,
    pub expires_at: String,
}

/// Resolve an access code to its room
///
/// POST /api/access/validate
pub async fn validate_code(
    State(state): State<AppState>,
    Json(req): Json<ValidateCodeRequest>,
) -> AppResult<Json<ValidateCodeResponse>> {
    let validated = state.access.validate(&req.code)?;
    Ok(Json(ValidateCodeResponse {
        room_id: validated.room_id.as_str().to_string(),
        phase: match validated.phase {
            SessionPhase::Active => "active",
            SessionPhase::Draining => "draining",
        },
    }))
}

/// Issue a new access code for a room (admin and above)
///
/// POST /api/rooms/:room_id/access
pub async fn issue_code(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<IssueCodeResponse>> {
    let actor = require_user(&headers)?;
    let room_id = RoomId::from_string(room_id);

    let session = state.ingress.issue_code(&room_id, &actor)?;

    Ok(Json(IssueCodeResponse {
        code: session.code,
        expires_at: session.expires_at_utc.to_rfc3339(),
    }))
}

/// Revoke an access code (admin and above in the code's studio)
///
/// DELETE /api/access/:code
pub async fn revoke_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> AppResult<axum::http::StatusCode> {
    let actor = require_user(&headers)?;
    state.ingress.revoke_code(&code, &actor)?;
    Ok(axum::http::StatusCode::NO_CONTENT)
}
