pub mod chat;
pub mod event;
pub mod id;
pub mod role;
pub mod room;

pub use chat::{ChatMessage, Emote, Reaction};
pub use event::{EndReason, EventPayload, RoomEvent, RoomSnapshot};
pub use id::{ConnectionId, RoomId, StudioId, UserId};
pub use role::{Action, Role};
pub use room::{Membership, Room, Studio};
