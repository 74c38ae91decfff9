//! Stagecast core engine
//!
//! The real-time heart of the Stagecast livestreaming site: room live-state
//! tracking, per-room event fan-out to connected viewers, and short-lived
//! access codes that gate viewer entry. Everything here is in-memory and
//! single-process; accounts, room CRUD forms, and the media pipeline live
//! in external collaborators.

pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod service;

pub use config::Config;
pub use error::{Error, Result};
