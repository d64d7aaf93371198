//! Shared server state: live rooms and client sockets.

pub mod catalog;
pub mod dealer;
pub mod registry;
pub mod room;
pub mod state_machine;
pub mod tally;
pub mod timer;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::{
    config::AppConfig,
    state::{registry::RoomRegistry, room::ConnectionId},
};

/// Application state shared between handlers.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ClientConnection {
    /// Identifier handed out on upgrade.
    pub id: ConnectionId,
    /// Outbound channel drained by the socket writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Central application state storing the rooms and the live socket connections.
pub struct AppState {
    config: Arc<AppConfig>,
    registry: RoomRegistry,
    connections: DashMap<ConnectionId, ClientConnection>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            registry: RoomRegistry::new(),
            connections: DashMap::new(),
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Registry of live rooms.
    pub fn rooms(&self) -> &RoomRegistry {
        &self.registry
    }

    /// Registry of active client sockets keyed by their identifier.
    pub fn connections(&self) -> &DashMap<ConnectionId, ClientConnection> {
        &self.connections
    }

    /// Register a new socket and return its handle.
    pub fn register_connection(&self, tx: mpsc::UnboundedSender<Message>) -> ConnectionId {
        let id = ConnectionId::new_v4();
        self.connections.insert(id, ClientConnection { id, tx });
        id
    }

    /// Drop a socket from the connection table.
    pub fn unregister_connection(&self, id: ConnectionId) {
        self.connections.remove(&id);
    }

    /// Outbound channel of a connection, if it is still live.
    pub fn sender(&self, id: ConnectionId) -> Option<mpsc::UnboundedSender<Message>> {
        self.connections.get(&id).map(|entry| entry.tx.clone())
    }
}
