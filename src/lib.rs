//! Library crate for spyglass-back, exposing modules for binaries and integration tests.

/// Runtime configuration and the location catalog.
pub mod config;
/// Wire types exchanged with clients.
pub mod dto;
/// Service error taxonomy.
pub mod error;
/// HTTP and WebSocket routes.
pub mod routes;
/// Room engine and message delivery.
pub mod services;
/// Shared state, rooms and game rules.
pub mod state;
