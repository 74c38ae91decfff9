//! Broadcast event types and the wire envelope.
//!
//! Every event pushed to a viewer is a JSON record `{type, seq, payload}`.
//! `seq` is the room's monotonically increasing broadcast counter; viewers
//! use it to detect gaps and resync via reconnect + snapshot.

use serde::{Deserialize, Serialize};

use super::chat::{ChatMessage, Reaction};

/// Why a session is being ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndReason {
    Expired,
    Revoked,
}

/// Event body, tagged for the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EventPayload {
    LiveStatusChanged { live: bool },
    ChatPosted(ChatMessage),
    ReactionFired(Reaction),
    /// Terminal notice delivered once to a draining subscriber. Targeted,
    /// not a room broadcast; carries the room's current seq for context and
    /// sits outside the strict-ordering contract.
    SessionEnding { reason: EndReason },
}

impl EventPayload {
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::LiveStatusChanged { .. } => "live_status_changed",
            Self::ChatPosted(_) => "chat_posted",
            Self::ReactionFired(_) => "reaction_fired",
            Self::SessionEnding { .. } => "session_ending",
        }
    }
}

/// Wire envelope: `{type, seq, payload}` once the payload tag is flattened in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEvent {
    pub seq: u64,
    #[serde(flatten)]
    pub payload: EventPayload,
}

/// Point-in-time room state handed to a subscriber at connect, before it
/// starts receiving deltas. Every event with seq > `last_seq` will be
/// delivered; nothing at or below it is re-sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub live: bool,
    pub viewer_count: usize,
    pub recent_chat: Vec<ChatMessage>,
    pub last_seq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::id::RoomId;

    #[test]
    fn test_envelope_shape() {
        let event = RoomEvent {
            seq: 7,
            payload: EventPayload::LiveStatusChanged { live: true },
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(json["seq"], 7);
        assert_eq!(json["type"], "live_status_changed");
        assert_eq!(json["payload"]["live"], true);
    }

    #[test]
    fn test_chat_envelope_round_trip() {
        let event = RoomEvent {
            seq: 3,
            payload: EventPayload::ChatPosted(ChatMessage {
                room_id: RoomId::from_string("room00000001".to_string()),
                author: "ada".to_string(),
                text: "hello".to_string(),
                seq: 3,
                timestamp: chrono::Utc::now(),
            }),
        };
        let json = serde_json::to_string(&event).expect("serialize");
        let back: RoomEvent = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.seq, 3);
        assert_eq!(back.payload.event_type(), "chat_posted");
    }
}
