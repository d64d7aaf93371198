use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use rand::CryptoRng;
use tokio::sync::Mutex;

use crate::state::room::{ConnectionId, Room, generate_room_code};

/// Shared handle to a room; the mutex serializes every command on it.
pub type RoomHandle = Arc<Mutex<Room>>;

/// Live rooms keyed by code, plus the room each connection belongs to.
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: DashMap<String, RoomHandle>,
    memberships: DashMap<ConnectionId, String>,
}

impl RoomRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a room built by `build` under a freshly generated, unused code.
    pub fn create<R, F>(&self, rng: &mut R, build: F) -> RoomHandle
    where
        R: CryptoRng,
        F: FnOnce(String) -> Room,
    {
        loop {
            let code = generate_room_code(rng);
            if let Entry::Vacant(slot) = self.rooms.entry(code.clone()) {
                let handle = Arc::new(Mutex::new(build(code)));
                slot.insert(handle.clone());
                return handle;
            }
        }
    }

    /// Look a room up by code, ignoring case and surrounding whitespace.
    pub fn find(&self, code: &str) -> Option<RoomHandle> {
        let code = code.trim().to_uppercase();
        self.rooms.get(&code).map(|entry| entry.value().clone())
    }

    /// Remove the room registered under `code` only if it is still `handle`.
    pub fn remove_if_same(&self, code: &str, handle: &RoomHandle) -> bool {
        self.rooms
            .remove_if(code, |_, current| Arc::ptr_eq(current, handle))
            .is_some()
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// Whether no room is live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Record that `connection` now plays in the room `code`.
    pub fn bind(&self, connection: ConnectionId, code: &str) {
        self.memberships.insert(connection, code.to_string());
    }

    /// Forget the membership of `connection`, returning the room code it was in.
    pub fn unbind(&self, connection: ConnectionId) -> Option<String> {
        self.memberships
            .remove(&connection)
            .map(|(_, code)| code)
    }

    /// Room code `connection` belongs to.
    pub fn room_of(&self, connection: ConnectionId) -> Option<String> {
        self.memberships
            .get(&connection)
            .map(|entry| entry.value().clone())
    }
}
