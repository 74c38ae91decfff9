//! Room registry: in-memory authoritative state of each room.
//!
//! Arena keyed by room id, each entry guarded by its own lock so unrelated
//! rooms never serialize against each other. The entry holds the live flag,
//! the bounded chat window (FIFO eviction: recency matters, not access
//! frequency), and the room's broadcast sequence counter. Viewer counts are
//! derived from the broadcast hub's subscriber set, never stored here.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

use crate::models::{ChatMessage, RoomId};
use crate::{Error, Result};

/// Mutable per-room state, always accessed under the room's lock.
#[derive(Debug)]
pub struct RoomState {
    pub live: bool,
    /// Broadcast sequence counter. Strictly increasing, never reused;
    /// incremented only under the room lock, so corruption is a programming
    /// invariant violation rather than a runtime condition.
    pub seq: u64,
    chat: VecDeque<ChatMessage>,
    window: usize,
}

impl RoomState {
    fn new(window: usize) -> Self {
        Self {
            live: false,
            seq: 0,
            chat: VecDeque::with_capacity(window),
            window,
        }
    }

    /// Hand out the next broadcast sequence number.
    pub fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Append to the transcript window, evicting the oldest message first.
    pub fn push_chat(&mut self, message: ChatMessage) {
        if self.chat.len() == self.window {
            self.chat.pop_front();
        }
        self.chat.push_back(message);
    }

    #[must_use]
    pub fn recent_chat(&self) -> Vec<ChatMessage> {
        self.chat.iter().cloned().collect()
    }
}

/// Arena of room entries, one lock per room.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Mutex<RoomState>>>,
    chat_window: usize,
}

impl RoomRegistry {
    #[must_use]
    pub fn new(chat_window: usize) -> Self {
        Self {
            rooms: DashMap::new(),
            chat_window,
        }
    }

    /// Register a room. Idempotent; an existing entry keeps its state.
    pub fn insert(&self, room_id: RoomId) {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(RoomState::new(self.chat_window))));
        debug!(room_id = %room_id, "Room registered");
    }

    /// Drop a room's runtime state. Returns whether an entry existed.
    pub fn remove(&self, room_id: &RoomId) -> bool {
        self.rooms.remove(room_id).is_some()
    }

    #[must_use]
    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    /// Run `f` inside the room's critical section. The broadcast hub uses
    /// this to sequence snapshot-then-subscribe and seq-assign-then-fan-out
    /// atomically with respect to each other.
    pub fn with_state<T>(&self, room_id: &RoomId, f: impl FnOnce(&mut RoomState) -> T) -> Result<T> {
        let entry = self
            .rooms
            .get(room_id)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| Error::NotFound(format!("Room {room_id}")))?;
        let mut state = entry.lock();
        Ok(f(&mut state))
    }

    pub fn is_live(&self, room_id: &RoomId) -> Result<bool> {
        self.with_state(room_id, |state| state.live)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(room_id: &RoomId, seq: u64, text: &str) -> ChatMessage {
        ChatMessage {
            room_id: room_id.clone(),
            author: "ada".to_string(),
            text: text.to_string(),
            seq,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_seq_is_monotonic() {
        let registry = RoomRegistry::new(10);
        let room = RoomId::new();
        registry.insert(room.clone());

        let seqs = registry
            .with_state(&room, |state| {
                (0..5).map(|_| state.next_seq()).collect::<Vec<_>>()
            })
            .expect("room exists");
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_chat_window_evicts_oldest_first() {
        let registry = RoomRegistry::new(3);
        let room = RoomId::new();
        registry.insert(room.clone());

        registry
            .with_state(&room, |state| {
                for i in 1..=5 {
                    let seq = state.next_seq();
                    state.push_chat(message(&room, seq, &format!("m{i}")));
                }
            })
            .expect("room exists");

        let recent = registry
            .with_state(&room, |state| state.recent_chat())
            .expect("room exists");
        let texts: Vec<_> = recent.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["m3", "m4", "m5"]);
    }

    #[test]
    fn test_unknown_room_is_not_found() {
        let registry = RoomRegistry::new(10);
        let missing = registry.with_state(&RoomId::new(), |_| ());
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_insert_is_idempotent() {
        let registry = RoomRegistry::new(10);
        let room = RoomId::new();
        registry.insert(room.clone());
        registry
            .with_state(&room, |state| {
                state.next_seq();
            })
            .expect("room exists");
        registry.insert(room.clone());
        let seq = registry.with_state(&room, |state| state.seq).expect("room exists");
        assert_eq!(seq, 1, "re-insert must not reset state");
    }
}
