use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{RoomId, StudioId, UserId};
use super::role::Role;

/// A studio owns 1..N rooms (capped by configuration) and scopes all role
/// memberships.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Studio {
    pub id: StudioId,
    pub name: String,
    pub owner: UserId,
    pub created_at: DateTime<Utc>,
    /// Next sequential room number handed out within this studio
    pub next_room_number: u32,
}

impl Studio {
    pub fn new(name: String, owner: UserId) -> Self {
        Self {
            id: StudioId::new(),
            name,
            owner,
            created_at: Utc::now(),
            next_room_number: 1,
        }
    }
}

/// Static room record. The live flag and transcript live in the room
/// registry, not here; this is identity plus display metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub studio_id: StudioId,
    pub name: String,
    /// Sequential number within the owning studio
    pub number: u32,
    pub created_at: DateTime<Utc>,
}

/// (user, studio) -> role binding. Exactly one role per user per studio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub studio_id: StudioId,
    pub user_id: UserId,
    pub role: Role,
}
