//! HTTP surface: the portal page and its JSON API

pub mod handlers;
pub mod server;
pub mod types;

pub use server::{router, start_server, spawn_live_updates, AppState, LiveUpdates};
