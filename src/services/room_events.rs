use axum::extract::ws::Message;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{
    dto::ws::ServerMessage,
    state::{
        SharedState,
        room::{ConnectionId, Room},
    },
};

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Returns `false` when the writer channel is closed; the socket handler
/// cleans the connection up on its own once the peer is gone.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
    context: &str,
) -> bool
where
    T: ?Sized + serde::Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(error = %err, context, "failed to serialize message `{value:?}`");
            return false;
        }
    };

    if tx.send(Message::Text(payload.into())).is_err() {
        debug!(context, "websocket writer closed; dropping message");
        return false;
    }
    true
}

/// Push a message to a single connection, if it is still live.
pub fn send_to_connection(state: &SharedState, connection: ConnectionId, message: &ServerMessage) {
    match state.sender(connection) {
        Some(tx) => {
            send_message_to_websocket(&tx, message, "direct message");
        }
        None => warn!(%connection, "cannot deliver message: connection is gone"),
    }
}

/// Push a message to every connected participant of `room`.
pub fn broadcast_to_room(state: &SharedState, room: &Room, message: &ServerMessage) {
    for participant in room.connected() {
        if let Some(tx) = state.sender(participant.connection) {
            send_message_to_websocket(&tx, message, "room broadcast");
        }
    }
}

/// Announce a new room revision so every member requests its own view.
pub fn broadcast_state_updated(state: &SharedState, room: &mut Room) {
    let seq = room.bump_revision();
    info!(
        room = %room.code(),
        seq,
        phase = room.phase().name(),
        transitions = room.transitions(),
        "broadcasting state update"
    );
    broadcast_to_room(state, room, &ServerMessage::StateUpdated { seq });
}
