use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{debug, info, warn};

use crate::{
    dto::ws::{ClientCommand, ServerMessage},
    error::ServiceError,
    services::{room_events, session_service},
    state::{SharedState, room::ConnectionId},
};

/// Handle the full lifecycle of an individual client WebSocket connection.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection = state.register_connection(outbound_tx.clone());
    info!(%connection, "client connected");

    while let Some(message) = receiver.next().await {
        match message {
            Ok(Message::Text(text)) => {
                debug!(%connection, payload = %text, "received client message");
                handle_text(&state, connection, text.as_str()).await;
            }
            Ok(Message::Ping(payload)) => {
                let _ = outbound_tx.send(Message::Pong(payload));
            }
            Ok(Message::Close(frame)) => {
                info!(%connection, "client closed");
                let _ = outbound_tx.send(Message::Close(frame));
                break;
            }
            Ok(Message::Binary(_)) => {
                warn!(%connection, "ignoring binary frame");
            }
            Ok(Message::Pong(_)) => {}
            Err(err) => {
                warn!(%connection, error = %err, "websocket error");
                break;
            }
        }
    }

    session_service::disconnect(&state, connection).await;
    state.unregister_connection(connection);
    info!(%connection, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Parse, validate and execute a single command, replying to the sender on failure.
async fn handle_text(state: &SharedState, connection: ConnectionId, text: &str) {
    let result = match ClientCommand::from_json_str(text) {
        Ok(command) => {
            let name = command.name();
            session_service::handle_command(state, connection, command)
                .await
                .inspect_err(|err| {
                    info!(%connection, command = name, kind = err.kind(), error = %err, "command rejected");
                })
        }
        Err(err) => {
            warn!(%connection, error = %err, "failed to parse or validate client message");
            Err(ServiceError::from(err))
        }
    };

    if let Err(err) = result {
        room_events::send_to_connection(state, connection, &ServerMessage::from(&err));
    }
}

async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}
