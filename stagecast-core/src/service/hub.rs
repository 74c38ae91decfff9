//! Broadcast hub: per-room publish/subscribe fan-out.
//!
//! Each room has a subscriber list; publishing assigns the room's next
//! sequence number inside the registry's room lock and enqueues the event
//! into every subscriber's bounded queue with `try_send`. Delivery to one
//! subscriber never blocks delivery to others: a full queue means that
//! subscriber is dropped on the spot and must reconnect + resnapshot. The
//! publisher is never blocked and never awaits subscriber I/O; the actual
//! socket write happens on each subscriber's own transport task.
//!
//! Snapshot-then-subscribe runs under the same room lock as publish, so a
//! new subscriber misses nothing after its snapshot seq and sees nothing at
//! or below it twice.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{
    ChatMessage, ConnectionId, EndReason, EventPayload, Reaction, RoomEvent, RoomId, RoomSnapshot,
    Role, UserId,
};
use crate::{Error, Result};

use super::access::AccessSessionStore;
use super::registry::RoomRegistry;

/// Who a subscriber is, for authorization and code-scoped teardown.
#[derive(Debug, Clone)]
pub enum Principal {
    Member { user_id: UserId, role: Role },
    Code { code: String },
}

impl Principal {
    fn is_code(&self, code: &str) -> bool {
        matches!(self, Self::Code { code: c } if c == code)
    }
}

#[derive(Debug, Clone)]
pub struct SubscriberIdentity {
    pub connection_id: ConnectionId,
    pub display_name: String,
    pub principal: Principal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubscriberState {
    Active,
    /// Terminal notice sent; nothing further is enqueued. The connection is
    /// closed by the sweeper at grace end or by the client hanging up.
    Draining,
}

struct SubscriberSlot {
    connection_id: ConnectionId,
    display_name: String,
    principal: Principal,
    tx: mpsc::Sender<RoomEvent>,
    state: SubscriberState,
    last_seq: u64,
}

type Topic = Arc<Mutex<Vec<SubscriberSlot>>>;

pub struct BroadcastHub {
    registry: Arc<RoomRegistry>,
    access: Arc<AccessSessionStore>,
    topics: DashMap<RoomId, Topic>,
    connections: DashMap<ConnectionId, RoomId>,
    queue_capacity: usize,
}

impl BroadcastHub {
    #[must_use]
    pub fn new(
        registry: Arc<RoomRegistry>,
        access: Arc<AccessSessionStore>,
        queue_capacity: usize,
    ) -> Self {
        Self {
            registry,
            access,
            topics: DashMap::new(),
            connections: DashMap::new(),
            queue_capacity,
        }
    }

    /// Topic for a registered room. Unknown rooms never get an entry, so the
    /// topics map cannot grow from requests against bogus room ids.
    fn topic(&self, room_id: &RoomId) -> Result<Topic> {
        if !self.registry.contains(room_id) {
            return Err(Error::NotFound(format!("Room {room_id}")));
        }
        Ok(Arc::clone(
            self.topics
                .entry(room_id.clone())
                .or_insert_with(|| Arc::new(Mutex::new(Vec::new())))
                .value(),
        ))
    }

    /// Existing topic only; absent means no subscribers.
    fn existing_topic(&self, room_id: &RoomId) -> Option<Topic> {
        self.topics.get(room_id).map(|t| Arc::clone(t.value()))
    }

    /// Register a subscriber and capture the room snapshot in one critical
    /// section. The returned receiver yields events in publish order;
    /// every event with seq > `snapshot.last_seq` will arrive on it.
    pub fn subscribe(
        &self,
        room_id: &RoomId,
        identity: SubscriberIdentity,
    ) -> Result<(RoomSnapshot, mpsc::Receiver<RoomEvent>)> {
        let topic = self.topic(room_id)?;
        let (tx, rx) = mpsc::channel(self.queue_capacity);

        self.connections
            .insert(identity.connection_id.clone(), room_id.clone());

        let snapshot = self.registry.with_state(room_id, |state| {
            let mut subscribers = topic.lock();
            subscribers.push(SubscriberSlot {
                connection_id: identity.connection_id.clone(),
                display_name: identity.display_name.clone(),
                principal: identity.principal.clone(),
                tx,
                state: SubscriberState::Active,
                last_seq: state.seq,
            });
            RoomSnapshot {
                live: state.live,
                viewer_count: subscribers.len(),
                recent_chat: state.recent_chat(),
                last_seq: state.seq,
            }
        });

        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(err) => {
                self.connections.remove(&identity.connection_id);
                return Err(err);
            }
        };

        info!(
            room_id = %room_id,
            connection_id = %identity.connection_id,
            viewer = %identity.display_name,
            "Subscriber connected"
        );
        Ok((snapshot, rx))
    }

    /// Idempotent removal; keeps viewer counts accurate on disconnect.
    pub fn unsubscribe(&self, connection_id: &ConnectionId) {
        let Some((_, room_id)) = self.connections.remove(connection_id) else {
            return;
        };
        let Some(topic) = self.existing_topic(&room_id) else {
            return;
        };
        let mut subscribers = topic.lock();
        let before = subscribers.len();
        subscribers.retain(|slot| {
            if slot.connection_id == *connection_id {
                self.release(slot);
                false
            } else {
                true
            }
        });
        if subscribers.len() < before {
            debug!(room_id = %room_id, connection_id = %connection_id, "Subscriber disconnected");
        }
    }

    /// Flip the room's live flag and broadcast the transition.
    pub fn set_live(&self, room_id: &RoomId, live: bool) -> Result<u64> {
        let topic = self.topic(room_id)?;
        let seq = self.registry.with_state(room_id, |state| {
            state.live = live;
            let seq = state.next_seq();
            let event = RoomEvent {
                seq,
                payload: EventPayload::LiveStatusChanged { live },
            };
            self.fan_out(room_id, &mut topic.lock(), &event);
            seq
        })?;
        info!(room_id = %room_id, live, seq, "Live status changed");
        Ok(seq)
    }

    /// Stamp, record, and broadcast a chat message.
    pub fn publish_chat(&self, room_id: &RoomId, author: String, text: String) -> Result<ChatMessage> {
        let topic = self.topic(room_id)?;
        self.registry.with_state(room_id, |state| {
            let seq = state.next_seq();
            let message = ChatMessage {
                room_id: room_id.clone(),
                author,
                text,
                seq,
                timestamp: chrono::Utc::now(),
            };
            state.push_chat(message.clone());
            let event = RoomEvent {
                seq,
                payload: EventPayload::ChatPosted(message.clone()),
            };
            self.fan_out(room_id, &mut topic.lock(), &event);
            message
        })
    }

    /// Broadcast a reaction. Never retained.
    pub fn publish_reaction(&self, room_id: &RoomId, reaction: Reaction) -> Result<u64> {
        let topic = self.topic(room_id)?;
        self.registry.with_state(room_id, |state| {
            let seq = state.next_seq();
            let event = RoomEvent {
                seq,
                payload: EventPayload::ReactionFired(reaction),
            };
            self.fan_out(room_id, &mut topic.lock(), &event);
            seq
        })
    }

    /// Move every subscriber bound to `code` into `Draining`, delivering at
    /// most one terminal notice each. Returns how many were notified.
    pub fn drain_code(&self, room_id: &RoomId, code: &str, reason: EndReason) -> usize {
        let current_seq = self
            .registry
            .with_state(room_id, |state| state.seq)
            .unwrap_or(0);
        let Some(topic) = self.existing_topic(room_id) else {
            return 0;
        };
        let mut subscribers = topic.lock();
        let mut notified = 0;
        for slot in subscribers.iter_mut() {
            if slot.state == SubscriberState::Active && slot.principal.is_code(code) {
                let event = RoomEvent {
                    seq: current_seq,
                    payload: EventPayload::SessionEnding { reason },
                };
                // Best effort: a full queue here just means the notice is
                // lost along with the subscriber at forced close.
                let _ = slot.tx.try_send(event);
                slot.state = SubscriberState::Draining;
                notified += 1;
            }
        }
        notified
    }

    /// Forcibly close every connection bound to `code`. Dropping the slot
    /// drops its sender, which ends the transport stream.
    pub fn close_code(&self, room_id: &RoomId, code: &str) -> usize {
        let Some(topic) = self.existing_topic(room_id) else {
            return 0;
        };
        let mut subscribers = topic.lock();
        let before = subscribers.len();
        subscribers.retain(|slot| {
            if slot.principal.is_code(code) {
                self.release(slot);
                false
            } else {
                true
            }
        });
        before - subscribers.len()
    }

    /// Tear down a room's subscriber set entirely (room removal).
    pub fn close_room(&self, room_id: &RoomId) -> usize {
        let Some((_, topic)) = self.topics.remove(room_id) else {
            return 0;
        };
        let mut subscribers = topic.lock();
        for slot in subscribers.iter() {
            self.release(slot);
        }
        let closed = subscribers.len();
        subscribers.clear();
        closed
    }

    /// Current viewer count, derived from the live subscriber set.
    #[must_use]
    pub fn viewer_count(&self, room_id: &RoomId) -> usize {
        self.topics
            .get(room_id)
            .map(|topic| topic.lock().len())
            .unwrap_or(0)
    }

    /// Enqueue an event to every active subscriber of the room. Draining
    /// subscribers receive nothing further; a full or closed queue removes
    /// the subscriber without blocking anyone else.
    fn fan_out(&self, room_id: &RoomId, subscribers: &mut Vec<SubscriberSlot>, event: &RoomEvent) -> usize {
        let mut delivered = 0;
        subscribers.retain_mut(|slot| {
            if slot.state == SubscriberState::Draining {
                return true;
            }
            match slot.tx.try_send(event.clone()) {
                Ok(()) => {
                    slot.last_seq = event.seq;
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        room_id = %room_id,
                        connection_id = %slot.connection_id,
                        seq = event.seq,
                        "Subscriber queue full, dropping slow subscriber"
                    );
                    self.release(slot);
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.release(slot);
                    false
                }
            }
        });
        delivered
    }

    /// Bookkeeping for any slot removal path: connection map entry and, for
    /// code-bound viewers, the session's connection slot.
    fn release(&self, slot: &SubscriberSlot) {
        self.connections.remove(&slot.connection_id);
        if let Principal::Code { code } = &slot.principal {
            self.access.detach(code);
        }
    }
}
