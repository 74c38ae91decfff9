//! Event ingress: the validating front door for everything that mutates a
//! room or opens a push stream.
//!
//! Every path validates fully before touching state: identity resolution,
//! authorization, payload checks, then the publish. Callers get typed errors
//! they can map straight onto HTTP statuses.

use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::models::{
    Action, ChatMessage, ConnectionId, Emote, EndReason, Reaction, Role, RoomEvent, RoomId,
    RoomSnapshot, UserId,
};
use crate::{Error, Result};

use super::access::{AccessSession, AccessSessionStore, SessionPhase};
use super::directory::Directory;
use super::hub::{BroadcastHub, Principal, SubscriberIdentity};
use super::rate_limit::ReactionLimiter;

/// How a caller identifies itself: a studio member by id, or a guest by
/// access code. Display names ride along for chat/reaction attribution.
#[derive(Debug, Clone)]
pub enum Credentials {
    Member {
        user_id: UserId,
        display_name: String,
    },
    Code {
        code: String,
        display_name: String,
    },
}

pub struct EventIngress {
    directory: Arc<Directory>,
    access: Arc<AccessSessionStore>,
    hub: Arc<BroadcastHub>,
    limiter: ReactionLimiter,
    max_chat_len: usize,
}

impl EventIngress {
    #[must_use]
    pub fn new(
        directory: Arc<Directory>,
        access: Arc<AccessSessionStore>,
        hub: Arc<BroadcastHub>,
        limiter: ReactionLimiter,
        max_chat_len: usize,
    ) -> Self {
        Self {
            directory,
            access,
            hub,
            limiter,
            max_chat_len,
        }
    }

    /// Open a push stream. Members need a studio role; guests consume one
    /// connection slot of their code, released again on disconnect.
    pub fn connect(
        &self,
        room_id: &RoomId,
        credentials: &Credentials,
    ) -> Result<(ConnectionId, RoomSnapshot, mpsc::Receiver<RoomEvent>)> {
        self.directory.room(room_id)?;
        let (principal, display_name) = match credentials {
            Credentials::Member {
                user_id,
                display_name,
            } => {
                let role = self
                    .directory
                    .room_role(room_id, user_id)?
                    .ok_or_else(|| Error::Unauthorized("Not a member of this studio".to_string()))?;
                if !role.allows(Action::ViewRoom) {
                    return Err(Error::Unauthorized("Viewing not permitted".to_string()));
                }
                (
                    Principal::Member {
                        user_id: user_id.clone(),
                        role,
                    },
                    display_name.clone(),
                )
            }
            Credentials::Code { code, display_name } => {
                self.access.attach(code, room_id)?;
                (Principal::Code { code: code.clone() }, display_name.clone())
            }
        };

        let identity = SubscriberIdentity {
            connection_id: ConnectionId::new(),
            display_name,
            principal: principal.clone(),
        };
        let connection_id = identity.connection_id.clone();

        match self.hub.subscribe(room_id, identity) {
            Ok((snapshot, rx)) => Ok((connection_id, snapshot, rx)),
            Err(err) => {
                // Give the slot back if registration failed after attach.
                if let Principal::Code { code } = &principal {
                    self.access.detach(code);
                }
                Err(err)
            }
        }
    }

    /// Synchronous unregistration on stream teardown.
    pub fn disconnect(&self, connection_id: &ConnectionId) {
        self.hub.unsubscribe(connection_id);
    }

    /// Trusted signal from the media pipeline. Every signal publishes, even
    /// when the flag is unchanged; dedup is the pipeline's business.
    pub fn stream_status(&self, room_id: &RoomId, live: bool) -> Result<u64> {
        self.hub.set_live(room_id, live)
    }

    /// Post a chat message to the room.
    pub fn post_chat(
        &self,
        room_id: &RoomId,
        credentials: &Credentials,
        text: String,
    ) -> Result<ChatMessage> {
        let author = self.authorize_push(room_id, credentials)?;
        let text = text.trim().to_string();
        if text.is_empty() {
            return Err(Error::InvalidInput("Chat message is empty".to_string()));
        }
        let len = text.chars().count();
        if len > self.max_chat_len {
            return Err(Error::PayloadTooLarge {
                len,
                max: self.max_chat_len,
            });
        }
        self.hub.publish_chat(room_id, author, text)
    }

    /// Fire a reaction. Parsed against the fixed emote set, then rate limited
    /// per (room, author) before it reaches the hub.
    pub fn post_reaction(
        &self,
        room_id: &RoomId,
        credentials: &Credentials,
        emote: &str,
    ) -> Result<u64> {
        let emote = Emote::from_str(emote).map_err(Error::InvalidReaction)?;
        let author = self.authorize_push(room_id, credentials)?;
        self.limiter.check(room_id, &author)?;
        self.hub
            .publish_reaction(room_id, Reaction::new(room_id.clone(), emote, author))
    }

    /// Issue an access code for a room. Admin and above.
    pub fn issue_code(&self, room_id: &RoomId, actor: &UserId) -> Result<AccessSession> {
        let room = self.directory.room(room_id)?;
        self.directory
            .require_role(&room.studio_id, actor, Action::RevokeSession)?;
        self.access.issue(room_id.clone(), actor.clone())
    }

    /// Revoke an access code and notify its connected viewers. Admin and
    /// above in the room's studio; teardown itself is left to the sweeper.
    pub fn revoke_code(&self, code: &str, actor: &UserId) -> Result<()> {
        let room_id = self.access.room_of(code)?;
        let room = self.directory.room(&room_id)?;
        self.directory
            .require_role(&room.studio_id, actor, Action::RevokeSession)?;
        self.access.revoke(code)?;
        let notified = self.hub.drain_code(&room_id, code, EndReason::Revoked);
        info!(room_id = %room_id, code = %code, notified, "Access code revoked by admin");
        Ok(())
    }

    /// Remove a room: directory + registry entry go, then every open stream
    /// is closed.
    pub fn remove_room(&self, room_id: &RoomId, actor: &UserId) -> Result<()> {
        self.directory.remove_room(room_id, actor)?;
        let closed = self.hub.close_room(room_id);
        info!(room_id = %room_id, closed, "Room removed, streams closed");
        Ok(())
    }

    /// Resolve and authorize a push (chat/reaction), returning the display
    /// name to attribute it to. Guests lose push authorization the moment
    /// their session starts draining, even though the stream stays up.
    fn authorize_push(&self, room_id: &RoomId, credentials: &Credentials) -> Result<String> {
        match credentials {
            Credentials::Member {
                user_id,
                display_name,
            } => {
                let role: Role = self
                    .directory
                    .room_role(room_id, user_id)?
                    .ok_or_else(|| Error::Unauthorized("Not a member of this studio".to_string()))?;
                if !role.allows(Action::SendChat) {
                    return Err(Error::Unauthorized("Posting not permitted".to_string()));
                }
                Ok(display_name.clone())
            }
            Credentials::Code { code, display_name } => {
                let validated = self.access.validate(code)?;
                if validated.room_id != *room_id {
                    return Err(Error::Unauthorized(
                        "Access code is scoped to a different room".to_string(),
                    ));
                }
                if validated.phase == SessionPhase::Draining {
                    return Err(Error::Expired);
                }
                Ok(display_name.clone())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::access::AccessPolicy;
    use crate::service::registry::RoomRegistry;
    use std::time::Duration;

    struct Fixture {
        ingress: EventIngress,
        directory: Arc<Directory>,
        access: Arc<AccessSessionStore>,
        owner: UserId,
        room: RoomId,
    }

    fn fixture() -> Fixture {
        let registry = Arc::new(RoomRegistry::new(50));
        let access = Arc::new(AccessSessionStore::new(AccessPolicy {
            code_length: 6,
            ttl: Duration::from_secs(60),
            grace: Duration::from_secs(60),
            max_concurrent: 2,
            issue_attempts: 64,
        }));
        let hub = Arc::new(BroadcastHub::new(
            Arc::clone(&registry),
            Arc::clone(&access),
            16,
        ));
        let directory = Arc::new(Directory::new(Arc::clone(&registry), 10));
        let owner = UserId::new();
        let studio = directory
            .create_studio("main".to_string(), owner.clone())
            .expect("studio");
        let room = directory
            .create_room(&studio.id, "stage".to_string(), &owner)
            .expect("room");

        let ingress = EventIngress::new(
            Arc::clone(&directory),
            Arc::clone(&access),
            hub,
            ReactionLimiter::new(Duration::from_millis(200)),
            500,
        );
        Fixture {
            ingress,
            directory,
            access,
            owner,
            room: room.id,
        }
    }

    fn member_creds(fixture: &Fixture) -> Credentials {
        Credentials::Member {
            user_id: fixture.owner.clone(),
            display_name: "ada".to_string(),
        }
    }

    #[tokio::test]
    async fn test_member_connect_and_chat() {
        let f = fixture();
        let creds = member_creds(&f);
        let (_conn, snapshot, mut rx) = f.ingress.connect(&f.room, &creds).expect("connect");
        assert_eq!(snapshot.last_seq, 0);

        let message = f
            .ingress
            .post_chat(&f.room, &creds, "hello room".to_string())
            .expect("chat");
        assert_eq!(message.seq, 1);

        let event = rx.recv().await.expect("event");
        assert_eq!(event.seq, 1);
        assert_eq!(event.payload.event_type(), "chat_posted");
    }

    #[tokio::test]
    async fn test_stranger_cannot_connect_or_post() {
        let f = fixture();
        let stranger = Credentials::Member {
            user_id: UserId::new(),
            display_name: "eve".to_string(),
        };
        assert!(matches!(
            f.ingress.connect(&f.room, &stranger),
            Err(Error::Unauthorized(_))
        ));
        assert!(matches!(
            f.ingress.post_chat(&f.room, &stranger, "hi".to_string()),
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_chat_length_boundary() {
        let f = fixture();
        let creds = member_creds(&f);
        let at_limit = "x".repeat(500);
        f.ingress
            .post_chat(&f.room, &creds, at_limit)
            .expect("500 chars accepted");

        let over = "x".repeat(501);
        match f.ingress.post_chat(&f.room, &creds, over) {
            Err(Error::PayloadTooLarge { len, max }) => {
                assert_eq!(len, 501);
                assert_eq!(max, 500);
            }
            other => panic!("expected PayloadTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unknown_emote_rejected_before_rate_limit() {
        let f = fixture();
        let creds = member_creds(&f);
        assert!(matches!(
            f.ingress.post_reaction(&f.room, &creds, "rocket"),
            Err(Error::InvalidReaction(_))
        ));
        // The bad attempt must not have consumed the author's quota
        f.ingress
            .post_reaction(&f.room, &creds, "heart")
            .expect("valid emote");
    }

    #[tokio::test]
    async fn test_reaction_rate_limited() {
        let f = fixture();
        let creds = member_creds(&f);
        f.ingress
            .post_reaction(&f.room, &creds, "fire")
            .expect("first");
        assert!(matches!(
            f.ingress.post_reaction(&f.room, &creds, "fire"),
            Err(Error::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_guest_lifecycle_via_code() {
        let f = fixture();
        let session = f.ingress.issue_code(&f.room, &f.owner).expect("issue");
        let guest = Credentials::Code {
            code: session.code.clone(),
            display_name: "guest".to_string(),
        };

        let (conn, _snapshot, mut rx) = f.ingress.connect(&f.room, &guest).expect("connect");
        f.ingress
            .post_chat(&f.room, &guest, "hi from guest".to_string())
            .expect("guest chat");
        rx.recv().await.expect("own message echoed");

        f.ingress.disconnect(&conn);
        // Slot released: attach twice more up to the cap of 2
        f.access.attach(&session.code, &f.room).expect("slot one");
        f.access.attach(&session.code, &f.room).expect("slot two");
    }

    #[tokio::test]
    async fn test_revoked_guest_gets_terminal_event_and_loses_push() {
        let f = fixture();
        let session = f.ingress.issue_code(&f.room, &f.owner).expect("issue");
        let guest = Credentials::Code {
            code: session.code.clone(),
            display_name: "guest".to_string(),
        };
        let (_conn, _snapshot, mut rx) = f.ingress.connect(&f.room, &guest).expect("connect");

        f.ingress
            .revoke_code(&session.code, &f.owner)
            .expect("revoke");

        let terminal = rx.recv().await.expect("terminal event");
        assert_eq!(terminal.payload.event_type(), "session_ending");
        assert!(matches!(
            f.ingress.post_chat(&f.room, &guest, "still here?".to_string()),
            Err(Error::Revoked)
        ));
    }

    #[tokio::test]
    async fn test_revoke_requires_admin() {
        let f = fixture();
        let session = f.ingress.issue_code(&f.room, &f.owner).expect("issue");
        let studio_id = f.directory.room(&f.room).expect("room").studio_id;
        let member = UserId::new();
        f.directory
            .set_role(&studio_id, &f.owner, member.clone(), Role::Member)
            .expect("set role");

        assert!(matches!(
            f.ingress.revoke_code(&session.code, &member),
            Err(Error::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn test_remove_room_closes_streams() {
        let f = fixture();
        let creds = member_creds(&f);
        let (_conn, _snapshot, mut rx) = f.ingress.connect(&f.room, &creds).expect("connect");

        f.ingress.remove_room(&f.room, &f.owner).expect("remove");
        assert!(rx.recv().await.is_none(), "stream ends on room removal");
        assert!(matches!(
            f.ingress.connect(&f.room, &creds),
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_live_signal_always_publishes() {
        let f = fixture();
        let creds = member_creds(&f);
        let (_conn, _snapshot, mut rx) = f.ingress.connect(&f.room, &creds).expect("connect");

        let first = f.ingress.stream_status(&f.room, true).expect("signal");
        let second = f.ingress.stream_status(&f.room, true).expect("repeat");
        assert_eq!(second, first + 1, "no dedup of repeated signals");

        assert_eq!(rx.recv().await.expect("first").seq, first);
        assert_eq!(rx.recv().await.expect("second").seq, second);
    }
}
