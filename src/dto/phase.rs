use serde::Serialize;
use utoipa::ToSchema;

use crate::state::state_machine::RoomPhase;

/// Room phase exposed to clients, without the phase-local data.
#[derive(Debug, Serialize, ToSchema, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VisiblePhase {
    /// Waiting for the host to start.
    Lobby,
    /// Free discussion.
    Playing,
    /// Vote in progress.
    Voting,
    /// Tied suspects defend themselves.
    Defense,
    /// Revote between tied suspects.
    Revote,
    /// The spy tries to name the location.
    SpyGuess,
    /// Round over, everything revealed.
    RoundEnd,
}

impl From<&RoomPhase> for VisiblePhase {
    fn from(value: &RoomPhase) -> Self {
        match value {
            RoomPhase::Lobby => VisiblePhase::Lobby,
            RoomPhase::Playing => VisiblePhase::Playing,
            RoomPhase::Voting { .. } => VisiblePhase::Voting,
            RoomPhase::Defense { .. } => VisiblePhase::Defense,
            RoomPhase::Revote { .. } => VisiblePhase::Revote,
            RoomPhase::SpyGuess { .. } => VisiblePhase::SpyGuess,
            RoomPhase::RoundEnd { .. } => VisiblePhase::RoundEnd,
        }
    }
}
