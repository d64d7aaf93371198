//! Drives complete sessions through the public command API, reading what each
//! client would receive on its socket.

use axum::extract::ws::Message;
use serde_json::Value;
use spyglass_back::{
    config::AppConfig,
    dto::ws::{ClientCommand, ServerMessage},
    services::session_service,
    state::{AppState, SharedState, room::ConnectionId},
};
use tokio::sync::mpsc;

struct Client {
    id: ConnectionId,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl Client {
    fn connect(state: &SharedState) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = state.register_connection(tx);
        Self { id, rx }
    }

    async fn send(&mut self, state: &SharedState, json: &str) -> Vec<Value> {
        let command = ClientCommand::from_json_str(json).unwrap();
        if let Err(err) = session_service::handle_command(state, self.id, command).await {
            return vec![serde_json::to_value(ServerMessage::from(&err)).unwrap()];
        }
        self.drain()
    }

    async fn view(&mut self, state: &SharedState) -> Value {
        let mut messages = self.send(state, r#"{"type":"request_state"}"#).await;
        messages
            .iter_mut()
            .rev()
            .find(|message| message["type"] == "game_state")
            .map(|message| message["state"].take())
            .unwrap()
    }

    fn drain(&mut self) -> Vec<Value> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if let Message::Text(text) = message {
                messages.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        messages
    }
}

async fn seated_room(state: &SharedState, names: &[&str]) -> (String, Vec<Client>) {
    let mut host = Client::connect(state);
    host.send(
        state,
        &format!(r#"{{"type":"create_room","name":"{}"}}"#, names[0]),
    )
    .await;
    let code = host.view(state).await["room_code"]
        .as_str()
        .unwrap()
        .to_string();

    let mut clients = vec![host];
    for name in &names[1..] {
        let mut client = Client::connect(state);
        let replies = client
            .send(
                state,
                &format!(
                    r#"{{"type":"join_room","name":"{name}","code":"{}"}}"#,
                    code.to_lowercase()
                ),
            )
            .await;
        assert!(replies.iter().all(|reply| reply["type"] != "error"));
        clients.push(client);
    }
    for client in &mut clients {
        client.drain();
    }
    (code, clients)
}

#[tokio::test]
async fn dealt_round_gives_each_player_a_private_card() {
    let state = AppState::new(AppConfig::default());
    let (_, mut clients) = seated_room(&state, &["Ann", "Bob", "Cid", "Dee"]).await;

    clients[0]
        .send(&state, r#"{"type":"start_game","minutes":3}"#)
        .await;
    for client in clients.iter_mut().skip(1) {
        let pushed = client.drain();
        assert!(
            pushed
                .iter()
                .any(|message| message["type"] == "state_updated")
        );
    }

    let mut spies = 0;
    let mut locations = Vec::new();
    for client in &mut clients {
        let view = client.view(&state).await;
        assert_eq!(view["phase"], "playing");
        assert_eq!(view["round_minutes"], 3);
        let round = &view["round"];
        if round["is_spy"].as_bool().unwrap() {
            spies += 1;
            assert!(round.get("location").is_none_or(Value::is_null));
        } else {
            locations.push(round["location"].as_str().unwrap().to_string());
        }
        assert!(view.get("round_end").is_none());
    }
    assert_eq!(spies, 1);
    locations.dedup();
    assert_eq!(locations.len(), 1);
}

#[tokio::test]
async fn rejected_commands_report_their_kind() {
    let state = AppState::new(AppConfig::default());
    let mut stranger = Client::connect(&state);
    let replies = stranger
        .send(&state, r#"{"type":"join_room","name":"Zed","code":"ZZZZZZ"}"#)
        .await;
    assert_eq!(replies[0]["kind"], "not_found");

    let (_, mut clients) = seated_room(&state, &["Ann", "Bob", "Cid"]).await;
    let replies = clients[1].send(&state, r#"{"type":"start_game"}"#).await;
    assert_eq!(replies[0]["type"], "error");
    assert_eq!(replies[0]["kind"], "unauthorized");

    let replies = clients[0].send(&state, r#"{"type":"call_vote"}"#).await;
    assert_eq!(replies[0]["kind"], "phase_conflict");
}

#[tokio::test]
async fn kicked_client_is_told_and_released() {
    let state = AppState::new(AppConfig::default());
    let (_, mut clients) = seated_room(&state, &["Ann", "Bob", "Cid"]).await;

    clients[0]
        .send(&state, r#"{"type":"kick_player","name":"cid"}"#)
        .await;
    let pushed = clients[2].drain();
    assert!(pushed.iter().any(|message| message["type"] == "kicked"));

    let view = clients[0].view(&state).await;
    assert_eq!(view["players"].as_array().unwrap().len(), 2);

    let replies = clients[2]
        .send(&state, r#"{"type":"create_room","name":"Cid"}"#)
        .await;
    assert!(replies.iter().all(|reply| reply["type"] != "error"));
    assert_eq!(state.rooms().len(), 2);
}

#[tokio::test]
async fn room_is_destroyed_when_everyone_leaves() {
    let state = AppState::new(AppConfig::default());
    let (code, mut clients) = seated_room(&state, &["Ann", "Bob"]).await;

    session_service::disconnect(&state, clients[0].id).await;
    let view = clients[1].view(&state).await;
    assert_eq!(view["is_host"], true);
    assert!(state.rooms().find(&code).is_some());

    session_service::disconnect(&state, clients[1].id).await;
    assert!(state.rooms().find(&code).is_none());
    assert!(state.rooms().is_empty());
}

#[tokio::test]
async fn reconnecting_player_keeps_their_card() {
    let state = AppState::new(AppConfig::default());
    let (code, mut clients) = seated_room(&state, &["Ann", "Bob", "Cid"]).await;
    clients[0].send(&state, r#"{"type":"start_game"}"#).await;
    let before = clients[1].view(&state).await["round"].clone();

    session_service::disconnect(&state, clients[1].id).await;
    let mut returning = Client::connect(&state);
    let replies = returning
        .send(
            &state,
            &format!(r#"{{"type":"join_room","name":"Bob","code":"{code}"}}"#),
        )
        .await;
    assert!(replies.iter().all(|reply| reply["type"] != "error"));

    let after = returning.view(&state).await["round"].clone();
    assert_eq!(before, after);

    let mut impostor = Client::connect(&state);
    let replies = impostor
        .send(
            &state,
            &format!(r#"{{"type":"join_room","name":"Eve","code":"{code}"}}"#),
        )
        .await;
    assert_eq!(replies[0]["kind"], "phase_conflict");
}
