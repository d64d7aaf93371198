//! Room session engine.
//!
//! Every command runs in two steps: a synchronous step that validates the
//! command against the caller and the phase, mutates the [`Room`] and returns
//! the resulting [`Effects`], then an async step that delivers those effects.
//! Guards always run before the first mutation, so a rejected command leaves
//! the room untouched. The per-room mutex is held across both steps.

use rand::CryptoRng;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::{
    dto::{
        validation::ROUND_MINUTES_RANGE,
        ws::{ClientCommand, ServerMessage},
    },
    error::ServiceError,
    services::{projection_service, room_events},
    state::{
        SharedState,
        catalog::LocationCatalog,
        dealer::{self, Deal},
        registry::RoomHandle,
        room::{Assignment, ConnectionId, Participant, Room, Round},
        state_machine::{RoomEvent, RoomPhase, RoundOutcome},
        tally::{self, Ballots, Tally},
        timer::Countdown,
    },
};

/// Connected participants needed to deal a round.
pub const MIN_PLAYERS: usize = 3;
/// Defense time per tied suspect; the suspects share one pooled countdown.
pub const DEFENSE_SECS_PER_SUSPECT: u64 = 30;

/// Messages and bookkeeping produced by a command that committed.
#[derive(Debug, Default)]
pub struct Effects {
    /// Private messages to single connections.
    pub replies: Vec<(ConnectionId, ServerMessage)>,
    /// Messages to every connected participant of the room.
    pub notices: Vec<ServerMessage>,
    /// Connection the host removed from the room.
    pub evicted: Option<ConnectionId>,
    /// Whether members must be told to refresh their view.
    pub broadcast: bool,
    /// Whether the last participant left and the room must be torn down.
    pub room_closed: bool,
}

impl Effects {
    fn changed() -> Self {
        Self {
            broadcast: true,
            ..Self::default()
        }
    }
}

/// Route a validated client command.
pub async fn handle_command(
    state: &SharedState,
    connection: ConnectionId,
    command: ClientCommand,
) -> Result<(), ServiceError> {
    match command {
        ClientCommand::CreateRoom { name } => create_room(state, connection, &name).await,
        ClientCommand::JoinRoom { name, code } => {
            join_room(state, connection, &name, &code).await
        }
        ClientCommand::RequestState => request_state(state, connection).await,
        ClientCommand::Unknown => Err(ServiceError::Validation("unknown command type".into())),
        command => apply_to_current_room(state, connection, command).await,
    }
}

/// Release the seat of a closed connection and settle its room.
pub async fn disconnect(state: &SharedState, connection: ConnectionId) {
    let Some(code) = state.rooms().unbind(connection) else {
        return;
    };
    let Some(handle) = state.rooms().find(&code) else {
        return;
    };

    let mut room = handle.lock().await;
    if room.is_closed() {
        return;
    }
    match leave(&mut room, connection) {
        Ok(effects) => dispatch(state, &handle, &mut room, effects),
        Err(err) => warn!(room = %code, error = %err, "failed to settle room after disconnect"),
    }
}

async fn create_room(
    state: &SharedState,
    connection: ConnectionId,
    name: &str,
) -> Result<(), ServiceError> {
    ensure_roomless(state, connection)?;
    let name = name.trim().to_string();
    let minutes = state.config().default_round_minutes();

    let handle = {
        let mut rng = rand::rng();
        state.rooms().create(&mut rng, |code| {
            Room::new(code, name.clone(), connection, minutes)
        })
    };

    let mut room = handle.lock().await;
    state.rooms().bind(connection, room.code());
    info!(room = %room.code(), player = %name, "room created");
    dispatch(state, &handle, &mut room, Effects::changed());
    Ok(())
}

async fn join_room(
    state: &SharedState,
    connection: ConnectionId,
    name: &str,
    code: &str,
) -> Result<(), ServiceError> {
    ensure_roomless(state, connection)?;
    let handle = state
        .rooms()
        .find(code)
        .ok_or_else(|| room_not_found(code))?;

    let mut room = handle.lock().await;
    if room.is_closed() {
        return Err(room_not_found(code));
    }
    let effects = join(&mut room, connection, name)?;
    state.rooms().bind(connection, room.code());
    dispatch(state, &handle, &mut room, effects);
    Ok(())
}

async fn request_state(state: &SharedState, connection: ConnectionId) -> Result<(), ServiceError> {
    let handle = current_room(state, connection)?;
    let room = handle.lock().await;
    if room.is_closed() {
        return Err(room_not_found(room.code()));
    }

    let view = projection_service::project(&room, connection, state.config().catalog())
        .ok_or_else(not_in_room)?;
    room_events::send_to_connection(
        state,
        connection,
        &ServerMessage::GameState {
            state: Box::new(view),
        },
    );
    Ok(())
}

async fn apply_to_current_room(
    state: &SharedState,
    connection: ConnectionId,
    command: ClientCommand,
) -> Result<(), ServiceError> {
    let handle = current_room(state, connection)?;
    let mut room = handle.lock().await;
    if room.is_closed() {
        return Err(room_not_found(room.code()));
    }

    let effects = {
        let mut rng = rand::rng();
        apply_command(
            &mut room,
            connection,
            command,
            state.config().catalog(),
            &mut rng,
            OffsetDateTime::now_utc(),
        )?
    };
    dispatch(state, &handle, &mut room, effects);
    Ok(())
}

/// Deliver the effects of a committed command while the room is still locked.
fn dispatch(state: &SharedState, handle: &RoomHandle, room: &mut Room, effects: Effects) {
    for (connection, message) in &effects.replies {
        room_events::send_to_connection(state, *connection, message);
    }
    if let Some(evicted) = effects.evicted {
        state.rooms().unbind(evicted);
    }
    for notice in &effects.notices {
        room_events::broadcast_to_room(state, room, notice);
    }

    if effects.room_closed {
        if state.rooms().remove_if_same(room.code(), handle) {
            info!(room = %room.code(), "room destroyed (empty)");
        }
        return;
    }
    if effects.broadcast {
        room_events::broadcast_state_updated(state, room);
    }
}

fn ensure_roomless(state: &SharedState, connection: ConnectionId) -> Result<(), ServiceError> {
    match state.rooms().room_of(connection) {
        Some(code) => Err(ServiceError::Validation(format!(
            "You are already in room '{code}'."
        ))),
        None => Ok(()),
    }
}

fn current_room(state: &SharedState, connection: ConnectionId) -> Result<RoomHandle, ServiceError> {
    let code = state
        .rooms()
        .room_of(connection)
        .ok_or_else(|| ServiceError::NotFound("You are not in a room.".into()))?;
    state
        .rooms()
        .find(&code)
        .ok_or_else(|| room_not_found(&code))
}

fn room_not_found(code: &str) -> ServiceError {
    ServiceError::NotFound(format!("Room '{}' not found.", code.trim().to_uppercase()))
}

fn not_in_room() -> ServiceError {
    ServiceError::NotFound("You are not part of this room.".into())
}

/// Apply an in-room command on behalf of the participant bound to `caller`.
pub fn apply_command<R: CryptoRng>(
    room: &mut Room,
    caller: ConnectionId,
    command: ClientCommand,
    catalog: &LocationCatalog,
    rng: &mut R,
    now: OffsetDateTime,
) -> Result<Effects, ServiceError> {
    match command {
        ClientCommand::StartGame { minutes } => start_game(room, caller, minutes, catalog, rng),
        ClientCommand::NewRound { minutes } => new_round(room, caller, minutes, catalog, rng),
        ClientCommand::StartTimer => start_timer(room, caller, now),
        ClientCommand::PauseTimer => pause_timer(room, caller, now),
        ClientCommand::UpdateNotes {
            target_name,
            note_text,
        } => update_notes(room, caller, &target_name, &note_text),
        ClientCommand::ToggleLocation { location } => {
            toggle_location(room, caller, &location, catalog)
        }
        ClientCommand::CallVote => call_vote(room, caller),
        ClientCommand::CastVote { target } => cast_vote(room, caller, &target),
        ClientCommand::CancelVote => cancel_vote(room, caller),
        ClientCommand::StartDefenseTimer => start_defense_timer(room, caller, now),
        ClientCommand::PauseDefenseTimer => pause_defense_timer(room, caller, now),
        ClientCommand::ProceedToRevote => proceed_to_revote(room, caller),
        ClientCommand::CastRevote { target } => cast_revote(room, caller, &target),
        ClientCommand::SpyGuess { location } => spy_guess(room, caller, &location, catalog),
        ClientCommand::ReturnToLobby => return_to_lobby(room, caller),
        ClientCommand::KickPlayer { name } => kick_player(room, caller, &name),
        ClientCommand::CreateRoom { .. } | ClientCommand::JoinRoom { .. } => Err(
            ServiceError::Validation("You are already in a room.".into()),
        ),
        ClientCommand::RequestState | ClientCommand::Unknown => Ok(Effects::default()),
    }
}

/// Seat `name` in the room, rebinding a disconnected participant of the same name.
pub fn join(room: &mut Room, connection: ConnectionId, name: &str) -> Result<Effects, ServiceError> {
    let name = name.trim();
    let in_round = room.phase().is_in_round();
    let code = room.code().to_string();

    if let Some(existing) = room.participant_by_name_mut(name) {
        if existing.connected {
            return Err(ServiceError::Validation(format!(
                "Name '{name}' is already taken."
            )));
        }
        if in_round && existing.assignment.is_none() {
            return Err(game_in_progress());
        }
        existing.connection = connection;
        existing.connected = true;
        info!(room = %code, player = %existing.name, "player reconnected");
        return Ok(Effects::changed());
    }

    if in_round {
        return Err(game_in_progress());
    }
    room.add_participant(name.to_string(), connection);
    info!(room = %code, player = %name, "player joined");
    Ok(Effects::changed())
}

/// Mark the participant bound to `connection` as gone.
///
/// The participant keeps its seat for a later reconnect. The host role moves
/// on, and an open vote is re-checked so the departure cannot stall it.
pub fn leave(room: &mut Room, connection: ConnectionId) -> Result<Effects, ServiceError> {
    let host = room.host();
    let Some(participant) = room.participant_by_connection_mut(connection) else {
        return Ok(Effects::default());
    };
    participant.connected = false;
    let id = participant.id;
    let name = participant.name.clone();
    info!(room = %room.code(), player = %name, "player disconnected");

    if room.connected_count() == 0 {
        room.close();
        return Ok(Effects {
            room_closed: true,
            ..Effects::default()
        });
    }

    if id == host {
        if let Some(next) = room.promote_next_host().map(|next| next.name.clone()) {
            info!(room = %room.code(), player = %next, "promoted new host");
        }
    }

    let mut effects = Effects::changed();
    settle_votes(room, &mut effects)?;
    Ok(effects)
}

fn caller_participant(room: &Room, caller: ConnectionId) -> Result<&Participant, ServiceError> {
    room.participant_by_connection(caller)
        .ok_or_else(not_in_room)
}

fn require_host(room: &Room, caller: ConnectionId, action: &str) -> Result<(), ServiceError> {
    caller_participant(room, caller)?;
    if !room.is_host_connection(caller) {
        return Err(ServiceError::Unauthorized(format!(
            "Only the host can {action}."
        )));
    }
    Ok(())
}

fn require_round(room: &Room, command: &str) -> Result<(), ServiceError> {
    if room.phase().is_in_round() {
        Ok(())
    } else {
        Err(phase_conflict(room, command))
    }
}

fn phase_conflict(room: &Room, command: &str) -> ServiceError {
    ServiceError::PhaseConflict(format!(
        "{command} is not allowed while the room is in {}",
        room.phase().name()
    ))
}

fn game_in_progress() -> ServiceError {
    ServiceError::PhaseConflict("Game already in progress. Cannot join.".into())
}

fn canonical_participant_name(room: &Room, name: &str) -> Result<String, ServiceError> {
    room.participant_by_name(name)
        .map(|participant| participant.name.clone())
        .ok_or_else(|| ServiceError::NotFound(format!("No player named '{}'.", name.trim())))
}

fn start_game<R: CryptoRng>(
    room: &mut Room,
    caller: ConnectionId,
    minutes: Option<u32>,
    catalog: &LocationCatalog,
    rng: &mut R,
) -> Result<Effects, ServiceError> {
    require_host(room, caller, "start the game")?;
    if !matches!(room.phase(), RoomPhase::Lobby) {
        return Err(phase_conflict(room, "start_game"));
    }
    deal_round(room, minutes, catalog, rng)
}

fn new_round<R: CryptoRng>(
    room: &mut Room,
    caller: ConnectionId,
    minutes: Option<u32>,
    catalog: &LocationCatalog,
    rng: &mut R,
) -> Result<Effects, ServiceError> {
    require_host(room, caller, "start a new round")?;
    if !matches!(room.phase(), RoomPhase::RoundEnd { .. }) {
        return Err(phase_conflict(room, "new_round"));
    }
    deal_round(room, minutes, catalog, rng)
}

fn deal_round<R: CryptoRng>(
    room: &mut Room,
    minutes: Option<u32>,
    catalog: &LocationCatalog,
    rng: &mut R,
) -> Result<Effects, ServiceError> {
    let players = room.connected_count();
    if players < MIN_PLAYERS {
        return Err(ServiceError::Validation(format!(
            "Need at least {MIN_PLAYERS} players to start."
        )));
    }
    if let Some(minutes) = minutes {
        if !ROUND_MINUTES_RANGE.contains(&minutes) {
            return Err(ServiceError::Validation(format!(
                "Round length must be between {} and {} minutes.",
                ROUND_MINUTES_RANGE.start(),
                ROUND_MINUTES_RANGE.end()
            )));
        }
    }

    let deal = dealer::deal(catalog, players, rng)?;
    room.transition(RoomEvent::StartRound)?;
    if let Some(minutes) = minutes {
        room.round_minutes = minutes;
    }
    apply_deal(room, deal);
    Ok(Effects::changed())
}

/// Hand the dealt cards to the connected participants, in join order.
fn apply_deal(room: &mut Room, deal: Deal) {
    let mut seat = 0;
    let mut spy = None;

    for participant in room.participants.iter_mut() {
        participant.assignment = None;
        participant.eliminated_locations.clear();
        if !participant.connected {
            continue;
        }

        let assignment = if seat == deal.spy_index {
            spy = Some((participant.id, participant.name.clone()));
            Assignment::Spy
        } else {
            Assignment::Civilian {
                location: deal.location.clone(),
                role: deal.role_for(seat).unwrap_or_default().to_string(),
            }
        };
        participant.assignment = Some(assignment);
        seat += 1;
    }

    room.round = spy.map(|(spy, spy_name)| Round {
        location: deal.location,
        spy,
        spy_name,
    });
    room.round_number += 1;
    room.round_timer = Countdown::Idle;
    info!(
        room = %room.code(),
        round = room.round_number,
        players = seat,
        "round dealt"
    );
}

fn start_timer(
    room: &mut Room,
    caller: ConnectionId,
    now: OffsetDateTime,
) -> Result<Effects, ServiceError> {
    require_host(room, caller, "control the timer")?;
    require_round(room, "start_timer")?;
    let duration = u64::from(room.round_minutes) * 60;
    room.round_timer.start(duration, now);
    Ok(Effects::changed())
}

fn pause_timer(
    room: &mut Room,
    caller: ConnectionId,
    now: OffsetDateTime,
) -> Result<Effects, ServiceError> {
    require_host(room, caller, "control the timer")?;
    require_round(room, "pause_timer")?;
    room.round_timer.pause(now);
    Ok(Effects::changed())
}

fn update_notes(
    room: &mut Room,
    caller: ConnectionId,
    target_name: &str,
    note_text: &str,
) -> Result<Effects, ServiceError> {
    caller_participant(room, caller)?;
    let target = canonical_participant_name(room, target_name)?;
    let participant = room
        .participant_by_connection_mut(caller)
        .ok_or_else(not_in_room)?;

    if note_text.trim().is_empty() {
        participant.notes.shift_remove(&target);
    } else {
        participant.notes.insert(target, note_text.to_string());
    }
    Ok(Effects::default())
}

fn toggle_location(
    room: &mut Room,
    caller: ConnectionId,
    location: &str,
    catalog: &LocationCatalog,
) -> Result<Effects, ServiceError> {
    caller_participant(room, caller)?;
    require_round(room, "toggle_location")?;
    let location = catalog
        .canonical_name(location)
        .ok_or_else(|| {
            ServiceError::Validation(format!("Unknown location '{}'.", location.trim()))
        })?
        .to_string();

    let participant = room
        .participant_by_connection_mut(caller)
        .ok_or_else(not_in_room)?;
    if !participant.eliminated_locations.shift_remove(&location) {
        participant.eliminated_locations.insert(location);
    }

    let eliminated_locations = participant.eliminated_locations.iter().cloned().collect();
    Ok(Effects {
        replies: vec![(
            caller,
            ServerMessage::LocationToggled {
                eliminated_locations,
            },
        )],
        ..Effects::default()
    })
}

fn call_vote(room: &mut Room, caller: ConnectionId) -> Result<Effects, ServiceError> {
    require_host(room, caller, "call a vote")?;
    room.transition(RoomEvent::CallVote)?;
    info!(room = %room.code(), "vote called");
    Ok(Effects::changed())
}

fn cancel_vote(room: &mut Room, caller: ConnectionId) -> Result<Effects, ServiceError> {
    require_host(room, caller, "cancel the vote")?;
    room.transition(RoomEvent::CancelVote)?;
    info!(room = %room.code(), "vote cancelled");
    Ok(Effects::changed())
}

fn cast_vote(room: &mut Room, caller: ConnectionId, target: &str) -> Result<Effects, ServiceError> {
    let voter = caller_participant(room, caller)?.name.clone();
    if !matches!(room.phase(), RoomPhase::Voting { .. }) {
        return Err(phase_conflict(room, "cast_vote"));
    }
    let target = canonical_participant_name(room, target)?;

    if let RoomPhase::Voting { ballots } = room.phase_mut() {
        ballots.insert(voter, target);
    }

    let mut effects = Effects::changed();
    settle_votes(room, &mut effects)?;
    Ok(effects)
}

fn start_defense_timer(
    room: &mut Room,
    caller: ConnectionId,
    now: OffsetDateTime,
) -> Result<Effects, ServiceError> {
    require_host(room, caller, "control the defense timer")?;
    if !matches!(room.phase(), RoomPhase::Defense { .. }) {
        return Err(phase_conflict(room, "start_defense_timer"));
    }

    if let RoomPhase::Defense {
        suspects, timer, ..
    } = room.phase_mut()
    {
        timer.start(DEFENSE_SECS_PER_SUSPECT * suspects.len() as u64, now);
    }
    Ok(Effects::changed())
}

fn pause_defense_timer(
    room: &mut Room,
    caller: ConnectionId,
    now: OffsetDateTime,
) -> Result<Effects, ServiceError> {
    require_host(room, caller, "control the defense timer")?;
    if !matches!(room.phase(), RoomPhase::Defense { .. }) {
        return Err(phase_conflict(room, "pause_defense_timer"));
    }

    if let RoomPhase::Defense { timer, .. } = room.phase_mut() {
        timer.pause(now);
    }
    Ok(Effects::changed())
}

fn proceed_to_revote(room: &mut Room, caller: ConnectionId) -> Result<Effects, ServiceError> {
    require_host(room, caller, "open the revote")?;
    room.transition(RoomEvent::ProceedToRevote)?;
    info!(room = %room.code(), "revote opened");

    let mut effects = Effects::changed();
    settle_votes(room, &mut effects)?;
    Ok(effects)
}

fn cast_revote(
    room: &mut Room,
    caller: ConnectionId,
    target: &str,
) -> Result<Effects, ServiceError> {
    let voter = caller_participant(room, caller)?.name.clone();
    let target = match room.phase() {
        RoomPhase::Revote { suspects, .. } => {
            if suspects.contains(&voter) {
                return Err(ServiceError::Unauthorized(
                    "Suspects cannot vote in the revote.".into(),
                ));
            }
            let wanted = target.trim().to_lowercase();
            suspects
                .iter()
                .find(|suspect| suspect.to_lowercase() == wanted)
                .cloned()
                .ok_or_else(|| {
                    ServiceError::Unauthorized("You can only vote for the suspects.".into())
                })?
        }
        _ => return Err(phase_conflict(room, "cast_revote")),
    };

    if let RoomPhase::Revote { ballots, .. } = room.phase_mut() {
        ballots.insert(voter, target);
    }

    let mut effects = Effects::changed();
    settle_votes(room, &mut effects)?;
    Ok(effects)
}

/// Whether every connected participant outside `excluded` has a ballot.
fn everyone_voted(room: &Room, ballots: &Ballots, excluded: &[String]) -> bool {
    room.connected()
        .filter(|participant| !excluded.contains(&participant.name))
        .all(|participant| ballots.contains_key(&participant.name))
}

/// Resolve the open vote or revote once nobody is left to cast a ballot.
fn settle_votes(room: &mut Room, effects: &mut Effects) -> Result<(), ServiceError> {
    let complete = match room.phase() {
        RoomPhase::Voting { ballots } => everyone_voted(room, ballots, &[]),
        RoomPhase::Revote {
            suspects, ballots, ..
        } => everyone_voted(room, ballots, suspects),
        _ => false,
    };
    if !complete {
        return Ok(());
    }

    if matches!(room.phase(), RoomPhase::Voting { .. }) {
        resolve_vote(room, effects)
    } else {
        resolve_revote(room)
    }
}

fn resolve_vote(room: &mut Room, effects: &mut Effects) -> Result<(), ServiceError> {
    let tally = match room.phase() {
        RoomPhase::Voting { ballots } => tally::resolve(ballots),
        _ => return Ok(()),
    };

    match tally {
        Tally::Empty => {
            room.transition(RoomEvent::ResumeDiscussion)?;
        }
        Tally::Accused(accused) => check_accusation(room, &accused)?,
        Tally::Tie(suspects) => {
            let can_break_tie = room
                .connected()
                .any(|participant| !suspects.contains(&participant.name));
            if can_break_tie {
                info!(room = %room.code(), ?suspects, "vote tied; opening defense");
                room.transition(RoomEvent::OpenDefense { suspects })?;
            } else {
                info!(room = %room.code(), "vote tied with nobody left to break it");
                room.transition(RoomEvent::ResumeDiscussion)?;
                effects.notices.push(ServerMessage::VoteResult {
                    result: "tie".into(),
                    message: "It's a tie and no one is left to break it! Back to discussion."
                        .into(),
                });
            }
        }
    }
    Ok(())
}

fn resolve_revote(room: &mut Room) -> Result<(), ServiceError> {
    let tally = match room.phase() {
        RoomPhase::Revote { ballots, .. } => tally::resolve(ballots),
        _ => return Ok(()),
    };

    match tally {
        Tally::Empty => {
            room.transition(RoomEvent::ResumeDiscussion)?;
        }
        Tally::Tie(_) => {
            room.transition(RoomEvent::EndRound(RoundOutcome::SpyWinsRevoteTie))?;
        }
        Tally::Accused(accused) => check_accusation(room, &accused)?,
    }
    Ok(())
}

fn check_accusation(room: &mut Room, accused: &str) -> Result<(), ServiceError> {
    let caught = room
        .round
        .as_ref()
        .is_some_and(|round| round.spy_name == accused);

    if caught {
        room.transition(RoomEvent::SpyCaught)?;
        info!(room = %room.code(), "spy unmasked");
    } else {
        room.transition(RoomEvent::EndRound(RoundOutcome::SpyWinsWrongVote))?;
        info!(room = %room.code(), "wrong player accused");
    }
    Ok(())
}

fn spy_guess(
    room: &mut Room,
    caller: ConnectionId,
    guess: &str,
    catalog: &LocationCatalog,
) -> Result<Effects, ServiceError> {
    let guesser = caller_participant(room, caller)?.id;
    if !matches!(room.phase(), RoomPhase::SpyGuess { .. }) {
        return Err(phase_conflict(room, "spy_guess"));
    }
    let round = room
        .round
        .as_ref()
        .ok_or_else(|| phase_conflict(room, "spy_guess"))?;
    if round.spy != guesser {
        return Err(ServiceError::Unauthorized("Only the spy can guess.".into()));
    }
    let location = round.location.clone();
    let guess = catalog
        .canonical_name(guess)
        .ok_or_else(|| ServiceError::Validation(format!("Unknown location '{}'.", guess.trim())))?
        .to_string();

    let remaining = match room.phase_mut() {
        RoomPhase::SpyGuess {
            guesses_remaining, ..
        } => {
            *guesses_remaining = guesses_remaining.saturating_sub(1);
            *guesses_remaining
        }
        _ => 0,
    };

    let mut effects = Effects::changed();
    if guess == location {
        room.transition(RoomEvent::EndRound(RoundOutcome::SpyWinsCorrectGuess))?;
        info!(room = %room.code(), "spy guessed the location");
    } else if remaining == 0 {
        room.transition(RoomEvent::EndRound(RoundOutcome::PlayersWin))?;
        info!(room = %room.code(), "spy ran out of guesses");
    } else {
        effects.replies.push((
            caller,
            ServerMessage::GuessResult {
                correct: false,
                remaining,
                message: format!("'{guess}' is wrong! You have {remaining} guess(es) left."),
            },
        ));
    }
    Ok(effects)
}

fn return_to_lobby(room: &mut Room, caller: ConnectionId) -> Result<Effects, ServiceError> {
    require_host(room, caller, "return to the lobby")?;
    room.transition(RoomEvent::ReturnToLobby)?;
    room.clear_game();
    info!(room = %room.code(), "returned to lobby");
    Ok(Effects::changed())
}

fn kick_player(room: &mut Room, caller: ConnectionId, name: &str) -> Result<Effects, ServiceError> {
    require_host(room, caller, "kick players")?;
    let target = room
        .participant_by_name(name)
        .ok_or_else(|| ServiceError::NotFound(format!("No player named '{}'.", name.trim())))?;
    if target.id == room.host() {
        return Err(ServiceError::Validation("You can't kick yourself.".into()));
    }
    let target_id = target.id;
    let kicked = room.remove_participant(target_id).ok_or_else(not_in_room)?;
    forget_participant(room, &kicked.name);
    info!(room = %room.code(), player = %kicked.name, "player kicked");

    let mut effects = Effects::changed();
    if kicked.connected {
        effects.replies.push((
            kicked.connection,
            ServerMessage::Kicked {
                message: "You have been removed from the room by the host.".into(),
            },
        ));
        effects.evicted = Some(kicked.connection);
    }

    let spy_kicked = room
        .round
        .as_ref()
        .is_some_and(|round| round.spy == kicked.id);
    let round_active = matches!(
        room.phase(),
        RoomPhase::Playing
            | RoomPhase::Voting { .. }
            | RoomPhase::Defense { .. }
            | RoomPhase::Revote { .. }
            | RoomPhase::SpyGuess { .. }
    );

    if spy_kicked && round_active {
        room.transition(RoomEvent::EndRound(RoundOutcome::SpyKicked))?;
        info!(room = %room.code(), "round ended: spy removed");
    } else {
        settle_suspects(room)?;
        settle_votes(room, &mut effects)?;
    }
    Ok(effects)
}

/// Erase an evicted participant from the open vote: ballots cast by or
/// naming them, and their place among the tied suspects.
fn forget_participant(room: &mut Room, name: &str) {
    let forget = |ballots: &mut Ballots| {
        ballots.retain(|voter, target| voter.as_str() != name && target.as_str() != name);
    };

    match room.phase_mut() {
        RoomPhase::Voting { ballots } => forget(ballots),
        RoomPhase::Defense {
            suspects, votes, ..
        } => {
            suspects.retain(|suspect| suspect != name);
            forget(votes);
        }
        RoomPhase::Revote {
            suspects,
            votes,
            ballots,
        } => {
            suspects.retain(|suspect| suspect != name);
            forget(votes);
            forget(ballots);
        }
        _ => {}
    }
}

/// Resolve a defense or revote left with fewer than two suspects.
fn settle_suspects(room: &mut Room) -> Result<(), ServiceError> {
    let suspects = match room.phase() {
        RoomPhase::Defense { suspects, .. } | RoomPhase::Revote { suspects, .. } => {
            suspects.clone()
        }
        _ => return Ok(()),
    };

    match suspects.as_slice() {
        [] => {
            room.transition(RoomEvent::ResumeDiscussion)?;
        }
        [accused] => check_accusation(room, accused)?,
        _ => {}
    }
    Ok(())
}
