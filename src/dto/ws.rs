use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{
        validation::{
            validate_display_name, validate_note_text, validate_room_code, validate_round_minutes,
        },
        view::PlayerView,
    },
    error::ServiceError,
};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
/// Commands accepted from player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientCommand {
    /// Open a new room with the caller as host.
    CreateRoom { name: String },
    /// Join (or reconnect into) an existing room.
    JoinRoom { name: String, code: String },
    /// Ask for the caller's personalised view of the room.
    RequestState,
    /// Deal the first round from the lobby.
    StartGame {
        #[serde(default)]
        minutes: Option<u32>,
    },
    /// Start or resume the round countdown.
    StartTimer,
    /// Pause the round countdown.
    PauseTimer,
    /// Store a private note about another participant.
    UpdateNotes {
        target_name: String,
        #[serde(default)]
        note_text: String,
    },
    /// Cross a location off (or back on) the caller's private list.
    ToggleLocation { location: String },
    /// Open a vote.
    CallVote,
    /// Vote for a suspect.
    CastVote { target: String },
    /// Withdraw the open vote.
    CancelVote,
    /// Start or resume the defense countdown.
    StartDefenseTimer,
    /// Pause the defense countdown.
    PauseDefenseTimer,
    /// Close the defense and open the revote.
    ProceedToRevote,
    /// Vote for one of the tied suspects.
    CastRevote { target: String },
    /// The unmasked spy names a location.
    SpyGuess { location: String },
    /// Deal the next round after a finished one.
    NewRound {
        #[serde(default)]
        minutes: Option<u32>,
    },
    /// Clear every round secret and go back to the lobby.
    ReturnToLobby,
    /// Remove a participant from the room.
    KickPlayer { name: String },
    #[serde(other)]
    /// Any command type this server does not know.
    Unknown,
}

impl Validate for ClientCommand {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match self {
            ClientCommand::CreateRoom { name } => {
                if let Err(e) = validate_display_name(name) {
                    errors.add("name", e);
                }
            }
            ClientCommand::JoinRoom { name, code } => {
                if let Err(e) = validate_display_name(name) {
                    errors.add("name", e);
                }
                if let Err(e) = validate_room_code(code) {
                    errors.add("code", e);
                }
            }
            ClientCommand::StartGame {
                minutes: Some(minutes),
            }
            | ClientCommand::NewRound {
                minutes: Some(minutes),
            } => {
                if let Err(e) = validate_round_minutes(*minutes) {
                    errors.add("minutes", e);
                }
            }
            ClientCommand::UpdateNotes { note_text, .. } => {
                if let Err(e) = validate_note_text(note_text) {
                    errors.add("note_text", e);
                }
            }
            _ => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Reasons an inbound frame could not be turned into a [`ClientCommand`].
#[derive(Debug, Error)]
pub enum CommandParseError {
    /// The frame is not a JSON command.
    #[error("malformed command: {0}")]
    Json(#[from] serde_json::Error),
    /// The command carries invalid arguments.
    #[error("invalid command: {0}")]
    Invalid(#[from] ValidationErrors),
}

impl From<CommandParseError> for ServiceError {
    fn from(err: CommandParseError) -> Self {
        match err {
            CommandParseError::Json(err) => ServiceError::Validation(err.to_string()),
            CommandParseError::Invalid(errors) => errors.into(),
        }
    }
}

impl ClientCommand {
    /// Parse and validate a JSON text frame.
    pub fn from_json_str(text: &str) -> Result<Self, CommandParseError> {
        let command: Self = serde_json::from_str(text)?;
        command.validate()?;
        Ok(command)
    }

    /// Stable snake_case name of the command, used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            ClientCommand::CreateRoom { .. } => "create_room",
            ClientCommand::JoinRoom { .. } => "join_room",
            ClientCommand::RequestState => "request_state",
            ClientCommand::StartGame { .. } => "start_game",
            ClientCommand::StartTimer => "start_timer",
            ClientCommand::PauseTimer => "pause_timer",
            ClientCommand::UpdateNotes { .. } => "update_notes",
            ClientCommand::ToggleLocation { .. } => "toggle_location",
            ClientCommand::CallVote => "call_vote",
            ClientCommand::CastVote { .. } => "cast_vote",
            ClientCommand::CancelVote => "cancel_vote",
            ClientCommand::StartDefenseTimer => "start_defense_timer",
            ClientCommand::PauseDefenseTimer => "pause_defense_timer",
            ClientCommand::ProceedToRevote => "proceed_to_revote",
            ClientCommand::CastRevote { .. } => "cast_revote",
            ClientCommand::SpyGuess { .. } => "spy_guess",
            ClientCommand::NewRound { .. } => "new_round",
            ClientCommand::ReturnToLobby => "return_to_lobby",
            ClientCommand::KickPlayer { .. } => "kick_player",
            ClientCommand::Unknown => "unknown",
        }
    }
}

/// Error categories reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unknown room or participant.
    NotFound,
    /// Missing or malformed input.
    Validation,
    /// The caller may not issue the command.
    Unauthorized,
    /// The room is in an incompatible phase.
    PhaseConflict,
}

impl From<&ServiceError> for ErrorKind {
    fn from(err: &ServiceError) -> Self {
        match err {
            ServiceError::NotFound(_) => ErrorKind::NotFound,
            ServiceError::Validation(_) => ErrorKind::Validation,
            ServiceError::Unauthorized(_) => ErrorKind::Unauthorized,
            ServiceError::PhaseConflict(_) => ErrorKind::PhaseConflict,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
/// Messages pushed to player WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The room changed; clients should request their view again.
    StateUpdated { seq: u64 },
    /// Personalised view of the room, answering `request_state`.
    GameState { state: Box<PlayerView> },
    /// A command from this client was rejected.
    Error { kind: ErrorKind, message: String },
    /// Feedback to the spy after a wrong guess with attempts left.
    GuessResult {
        correct: bool,
        remaining: u8,
        message: String,
    },
    /// Room-wide notice about a vote that could not be resolved.
    VoteResult { result: String, message: String },
    /// Updated private list of crossed-off locations.
    LocationToggled { eliminated_locations: Vec<String> },
    /// The host removed this client from the room.
    Kicked { message: String },
}

impl From<&ServiceError> for ServerMessage {
    fn from(err: &ServiceError) -> Self {
        let message = match err {
            ServiceError::NotFound(message)
            | ServiceError::Validation(message)
            | ServiceError::Unauthorized(message)
            | ServiceError::PhaseConflict(message) => message.clone(),
        };
        ServerMessage::Error {
            kind: err.into(),
            message,
        }
    }
}
