use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::id::RoomId;

/// Chat message, immutable once created. Retained only in the bounded
/// in-memory window of its room; not a durable log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub room_id: RoomId,
    /// Author display name (member username or guest label)
    pub author: String,
    pub text: String,
    /// Room broadcast sequence number stamped at publish time
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
}

/// Fixed allowed emote set, shared with the client. The server is
/// authoritative: anything outside this set is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emote {
    Heart,
    Fire,
    Clap,
    Laugh,
    Wow,
    Hundred,
}

impl Emote {
    pub const ALL: [Self; 6] = [
        Self::Heart,
        Self::Fire,
        Self::Clap,
        Self::Laugh,
        Self::Wow,
        Self::Hundred,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Heart => "heart",
            Self::Fire => "fire",
            Self::Clap => "clap",
            Self::Laugh => "laugh",
            Self::Wow => "wow",
            Self::Hundred => "hundred",
        }
    }
}

impl FromStr for Emote {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "heart" => Ok(Self::Heart),
            "fire" => Ok(Self::Fire),
            "clap" => Ok(Self::Clap),
            "laugh" => Ok(Self::Laugh),
            "wow" => Ok(Self::Wow),
            "hundred" => Ok(Self::Hundred),
            _ => Err(format!("Unknown emote: {s}")),
        }
    }
}

impl std::fmt::Display for Emote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reaction event (memory-only, broadcast and forgotten)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub room_id: RoomId,
    pub emote: Emote,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

impl Reaction {
    pub fn new(room_id: RoomId, emote: Emote, author: String) -> Self {
        Self {
            room_id,
            emote,
            author,
            timestamp: Utc::now(),
        }
    }
}
