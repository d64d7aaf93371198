use indexmap::{IndexMap, IndexSet};
use rand::{CryptoRng, Rng};
use uuid::Uuid;

use crate::state::{
    state_machine::{InvalidTransition, RoomEvent, RoomPhase, RoomStateMachine},
    timer::Countdown,
};

/// Handle of a live client connection. Changes when a participant reconnects.
pub type ConnectionId = Uuid;
/// Stable identifier of a participant for the lifetime of its room.
pub type ParticipantId = Uuid;

/// Role name shown to the spy.
pub const SPY_ROLE: &str = "SPY";
/// Length of generated room codes.
pub const ROOM_CODE_LENGTH: usize = 6;
const ROOM_CODE_CHARS: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Generate a random uppercase alphanumeric room code.
pub fn generate_room_code<R: CryptoRng>(rng: &mut R) -> String {
    (0..ROOM_CODE_LENGTH)
        .map(|_| ROOM_CODE_CHARS[rng.random_range(0..ROOM_CODE_CHARS.len())] as char)
        .collect()
}

/// Secret card a participant received for the current round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// The participant does not know the location.
    Spy,
    /// The participant knows the location and plays a role there.
    Civilian {
        /// Secret location of the round.
        location: String,
        /// Role drawn from the location's pool.
        role: String,
    },
}

/// Player seated in a room.
#[derive(Debug, Clone)]
pub struct Participant {
    /// Stable identifier, kept across reconnects.
    pub id: ParticipantId,
    /// Connection currently bound to this participant.
    pub connection: ConnectionId,
    /// Display name, unique (case-insensitively) within the room.
    pub name: String,
    /// Whether the connection is currently live.
    pub connected: bool,
    /// Card dealt for the current round.
    pub assignment: Option<Assignment>,
    /// Private notes keyed by other participants' names.
    pub notes: IndexMap<String, String>,
    /// Private list of locations the participant crossed off.
    pub eliminated_locations: IndexSet<String>,
}

impl Participant {
    fn new(name: String, connection: ConnectionId) -> Self {
        Self {
            id: Uuid::new_v4(),
            connection,
            name,
            connected: true,
            assignment: None,
            notes: IndexMap::new(),
            eliminated_locations: IndexSet::new(),
        }
    }

    /// Case-insensitive name comparison.
    pub fn has_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.trim().to_lowercase()
    }

    /// Whether the participant is the spy of the current round.
    pub fn is_spy(&self) -> bool {
        matches!(self.assignment, Some(Assignment::Spy))
    }

    /// Role name shown to the participant.
    pub fn role(&self) -> Option<&str> {
        match &self.assignment {
            Some(Assignment::Spy) => Some(SPY_ROLE),
            Some(Assignment::Civilian { role, .. }) => Some(role),
            None => None,
        }
    }

    /// Location shown to the participant (`None` for the spy).
    pub fn location(&self) -> Option<&str> {
        match &self.assignment {
            Some(Assignment::Civilian { location, .. }) => Some(location),
            _ => None,
        }
    }

    /// Forget everything tied to a round or a game.
    fn clear_secrets(&mut self) {
        self.assignment = None;
        self.notes.clear();
        self.eliminated_locations.clear();
    }
}

/// Secret facts of the round in progress.
#[derive(Debug, Clone)]
pub struct Round {
    /// Location every civilian shares.
    pub location: String,
    /// Participant holding the spy card.
    pub spy: ParticipantId,
    /// Name of the spy when the round was dealt; survives eviction.
    pub spy_name: String,
}

/// Authoritative state of one game session.
#[derive(Debug)]
pub struct Room {
    code: String,
    host: ParticipantId,
    machine: RoomStateMachine,
    revision: u64,
    closed: bool,
    /// Participants in join order.
    pub participants: Vec<Participant>,
    /// Secret round data, present while a round is dealt.
    pub round: Option<Round>,
    /// Rounds dealt since the last return to the lobby.
    pub round_number: u32,
    /// Length of a round in minutes.
    pub round_minutes: u32,
    /// Discussion countdown of the current round.
    pub round_timer: Countdown,
}

impl Room {
    /// Open a room with its creator as host.
    pub fn new(
        code: String,
        host_name: String,
        connection: ConnectionId,
        round_minutes: u32,
    ) -> Self {
        let host = Participant::new(host_name, connection);
        Self {
            code,
            host: host.id,
            machine: RoomStateMachine::new(),
            revision: 0,
            closed: false,
            participants: vec![host],
            round: None,
            round_number: 0,
            round_minutes,
            round_timer: Countdown::Idle,
        }
    }

    /// Room code players use to join.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Current phase.
    pub fn phase(&self) -> &RoomPhase {
        self.machine.phase()
    }

    /// Phase-local bookkeeping (ballots, defense timer, guesses).
    pub fn phase_mut(&mut self) -> &mut RoomPhase {
        self.machine.phase_mut()
    }

    /// Number of phase transitions applied.
    pub fn transitions(&self) -> usize {
        self.machine.version()
    }

    /// Move to the next phase.
    pub fn transition(&mut self, event: RoomEvent) -> Result<&RoomPhase, InvalidTransition> {
        self.machine.apply(event)
    }

    /// Revision announced with the latest state broadcast.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Advance the revision for a new broadcast and return it.
    pub fn bump_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    /// Whether the room was torn down.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the room as torn down; later commands see it as missing.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Identifier of the current host.
    pub fn host(&self) -> ParticipantId {
        self.host
    }

    /// Whether `connection` is bound to the host.
    pub fn is_host_connection(&self, connection: ConnectionId) -> bool {
        self.participant_by_connection(connection)
            .is_some_and(|participant| participant.id == self.host)
    }

    /// Look up the connected participant bound to `connection`.
    pub fn participant_by_connection(&self, connection: ConnectionId) -> Option<&Participant> {
        self.participants
            .iter()
            .find(|p| p.connected && p.connection == connection)
    }

    /// Mutable variant of [`Self::participant_by_connection`].
    pub fn participant_by_connection_mut(
        &mut self,
        connection: ConnectionId,
    ) -> Option<&mut Participant> {
        self.participants
            .iter_mut()
            .find(|p| p.connected && p.connection == connection)
    }

    /// Look a participant up by name, ignoring case.
    pub fn participant_by_name(&self, name: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.has_name(name))
    }

    /// Mutable variant of [`Self::participant_by_name`].
    pub fn participant_by_name_mut(&mut self, name: &str) -> Option<&mut Participant> {
        self.participants.iter_mut().find(|p| p.has_name(name))
    }

    /// Connected participants in join order.
    pub fn connected(&self) -> impl Iterator<Item = &Participant> {
        self.participants.iter().filter(|p| p.connected)
    }

    /// Number of connected participants.
    pub fn connected_count(&self) -> usize {
        self.connected().count()
    }

    /// Seat a new participant and return its id.
    pub fn add_participant(&mut self, name: String, connection: ConnectionId) -> ParticipantId {
        let participant = Participant::new(name, connection);
        let id = participant.id;
        self.participants.push(participant);
        id
    }

    /// Remove a participant for good.
    pub fn remove_participant(&mut self, id: ParticipantId) -> Option<Participant> {
        let index = self.participants.iter().position(|p| p.id == id)?;
        Some(self.participants.remove(index))
    }

    /// Hand host authority to the earliest-joined connected participant
    /// other than the current host.
    pub fn promote_next_host(&mut self) -> Option<&Participant> {
        let current = self.host;
        let next = self
            .participants
            .iter()
            .find(|p| p.connected && p.id != current)?;
        self.host = next.id;
        Some(next)
    }

    /// Drop every per-round and per-game secret and reset the round counter.
    pub fn clear_game(&mut self) {
        self.round = None;
        self.round_number = 0;
        self.round_timer = Countdown::Idle;
        for participant in &mut self.participants {
            participant.clear_secrets();
        }
    }
}
