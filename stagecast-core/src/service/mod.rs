pub mod access;
pub mod directory;
pub mod hub;
pub mod ingress;
pub mod rate_limit;
pub mod registry;

pub use access::{AccessPolicy, AccessSession, AccessSessionStore, SessionPhase, spawn_sweeper};
pub use directory::Directory;
pub use hub::{BroadcastHub, Principal, SubscriberIdentity};
pub use ingress::{Credentials, EventIngress};
pub use rate_limit::ReactionLimiter;
pub use registry::{RoomRegistry, RoomState};
