//! parleyd - a real-time chat coordinator.
//!
//! Accepts WebSocket connections, routes chat events between them and keeps
//! the transient conversation state (rooms, ring-buffer history, typing
//! indicators, reactions, read receipts) in memory. Durable storage sits
//! behind a pluggable collaborator trait.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod http;
pub mod metrics;
pub mod network;
pub mod protocol;
pub mod services;
pub mod state;
pub mod store;
