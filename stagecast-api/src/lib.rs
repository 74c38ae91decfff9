//! Stagecast HTTP API: the server-side surface of the room broadcast engine.

pub mod http;

pub use http::{create_router, AppState};
