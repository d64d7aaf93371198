//! Per-participant projection of a room.
//!
//! A view never carries another participant's card, notes or scratch list,
//! and only names the spy once the round is over.

use crate::{
    dto::view::{
        DefenseView, PlayerSummary, PlayerView, RevoteView, RoundEndView, RoundView,
        SpyGuessView, TimerView, VotingView, ballot_views,
    },
    state::{
        catalog::LocationCatalog,
        room::{ConnectionId, Room},
        state_machine::RoomPhase,
    },
};

/// Build the view of `room` for the participant bound to `connection`.
pub fn project(
    room: &Room,
    connection: ConnectionId,
    catalog: &LocationCatalog,
) -> Option<PlayerView> {
    let viewer = room.participant_by_connection(connection)?;
    let host = room.host();
    let phase = room.phase();

    let players = room
        .participants
        .iter()
        .map(|participant| PlayerSummary {
            name: participant.name.clone(),
            is_host: participant.id == host,
            connected: participant.connected,
        })
        .collect();

    let mut view = PlayerView {
        seq: room.revision(),
        room_code: room.code().to_string(),
        phase: phase.into(),
        players,
        round_number: room.round_number,
        round_minutes: room.round_minutes,
        timer: TimerView::from(&room.round_timer),
        is_host: viewer.id == host,
        my_name: viewer.name.clone(),
        round: None,
        voting: None,
        defense: None,
        revote: None,
        spy_guess: None,
        round_end: None,
    };

    if phase.is_in_round() {
        view.round = Some(RoundView {
            is_spy: viewer.is_spy(),
            role: viewer.role().map(str::to_string),
            location: viewer.location().map(str::to_string),
            all_locations: catalog.sorted_names().to_vec(),
            eliminated_locations: viewer.eliminated_locations.iter().cloned().collect(),
            notes: viewer
                .notes
                .iter()
                .map(|(target, note)| (target.clone(), note.clone()))
                .collect(),
        });
    }

    match phase {
        RoomPhase::Lobby | RoomPhase::Playing => {}
        RoomPhase::Voting { ballots } => {
            view.voting = Some(VotingView {
                voted_players: ballots.keys().cloned().collect(),
                my_vote: ballots.get(&viewer.name).cloned(),
            });
        }
        RoomPhase::Defense {
            suspects,
            votes,
            timer,
        } => {
            view.defense = Some(DefenseView {
                tied_suspects: suspects.clone(),
                is_suspect: suspects.contains(&viewer.name),
                timer: TimerView::from(timer),
                first_round_votes: ballot_views(votes),
            });
        }
        RoomPhase::Revote {
            suspects, ballots, ..
        } => {
            let is_suspect = suspects.contains(&viewer.name);
            view.revote = Some(RevoteView {
                tied_suspects: suspects.clone(),
                is_suspect,
                can_revote: !is_suspect,
                voted_players: ballots.keys().cloned().collect(),
                my_revote: ballots.get(&viewer.name).cloned(),
            });
        }
        RoomPhase::SpyGuess {
            guesses_remaining, ..
        } => {
            view.spy_guess = Some(SpyGuessView {
                guesses_remaining: *guesses_remaining,
                can_guess: room
                    .round
                    .as_ref()
                    .is_some_and(|round| round.spy == viewer.id),
            });
        }
        RoomPhase::RoundEnd { outcome, votes } => {
            let (spy_name, location) = room
                .round
                .as_ref()
                .map(|round| (round.spy_name.clone(), round.location.clone()))
                .unwrap_or_default();
            view.round_end = Some(RoundEndView {
                spy_name,
                location,
                outcome: outcome.tag().to_string(),
                votes: ballot_views(votes),
            });
        }
    }

    Some(view)
}
