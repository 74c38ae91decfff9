// Module: http
// HTTP/JSON surface: viewer push streams, chat/reaction submission, access
// code lifecycle, and the trusted internal control plane.

pub mod access;
pub mod chat;
pub mod error;
pub mod events;
pub mod health;
pub mod internal;
pub mod reaction;

use axum::{
    http::HeaderMap,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use stagecast_core::service::{
    AccessSessionStore, BroadcastHub, Directory, EventIngress, ReactionLimiter, RoomRegistry,
};
use stagecast_core::service::{Credentials, spawn_sweeper};
use stagecast_core::models::UserId;
use stagecast_core::Config;

pub use error::{AppError, AppResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub ingress: Arc<EventIngress>,
    pub directory: Arc<Directory>,
    pub access: Arc<AccessSessionStore>,
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    /// Wire the engine from configuration.
    pub fn from_config(config: &Config) -> Self {
        let registry = Arc::new(RoomRegistry::new(config.room.chat_window));
        let access = Arc::new(AccessSessionStore::new((&config.access).into()));
        let hub = Arc::new(BroadcastHub::new(
            Arc::clone(&registry),
            Arc::clone(&access),
            config.hub.subscriber_queue,
        ));
        let directory = Arc::new(Directory::new(
            Arc::clone(&registry),
            config.room.max_rooms_per_studio,
        ));
        let ingress = Arc::new(EventIngress::new(
            Arc::clone(&directory),
            Arc::clone(&access),
            Arc::clone(&hub),
            ReactionLimiter::new(config.hub.reaction_cooldown()),
            config.room.max_chat_len,
        ));
        Self {
            ingress,
            directory,
            access,
            hub,
        }
    }

    /// Start the session sweeper for this state's stores.
    pub fn start_sweeper(&self, config: &Config) -> tokio::task::JoinHandle<()> {
        spawn_sweeper(
            Arc::clone(&self.access),
            Arc::clone(&self.hub),
            config.access.sweep_interval(),
        )
    }
}

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(health::create_health_router())
        // Viewer-facing room endpoints
        .route("/api/rooms/:room_id/events", get(events::room_events))
        .route("/api/rooms/:room_id/chat", post(chat::post_chat))
        .route("/api/rooms/:room_id/reactions", post(reaction::post_reaction))
        // Access code lifecycle
        .route("/api/access/validate", post(access::validate_code))
        .route("/api/rooms/:room_id/access", post(access::issue_code))
        .route("/api/access/:code", delete(access::revoke_code))
        // Trusted control plane (media pipeline + provisioning)
        .route("/internal/rooms/:room_id/live", post(internal::set_live))
        .route("/internal/rooms/:room_id", delete(internal::remove_room))
        .route("/internal/studios", post(internal::create_studio))
        .route(
            "/internal/studios/:studio_id/rooms",
            post(internal::create_room),
        )
        .route(
            "/internal/studios/:studio_id/members",
            put(internal::set_role),
        )
        .route(
            "/internal/studios/:studio_id/transfer",
            post(internal::transfer_ownership),
        )
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Resolve caller credentials: a member via `x-user-id`/`x-user-name`
/// headers, or a guest via an access code carried in the request.
pub(crate) fn credentials_from(
    headers: &HeaderMap,
    code: Option<String>,
    name: Option<String>,
) -> AppResult<Credentials> {
    if let Some(user_id) = header_value(headers, "x-user-id") {
        let display_name =
            header_value(headers, "x-user-name").unwrap_or_else(|| "member".to_string());
        return Ok(Credentials::Member {
            user_id: UserId::from_string(user_id),
            display_name,
        });
    }
    if let Some(code) = code {
        let display_name = name.unwrap_or_else(|| "guest".to_string());
        return Ok(Credentials::Code { code, display_name });
    }
    Err(AppError::unauthorized(
        "Provide x-user-id or an access code",
    ))
}

/// Resolve the acting member for admin and internal endpoints.
pub(crate) fn require_user(headers: &HeaderMap) -> AppResult<UserId> {
    header_value(headers, "x-user-id")
        .map(UserId::from_string)
        .ok_or_else(|| AppError::unauthorized("Missing x-user-id header"))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}
