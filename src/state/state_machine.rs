use thiserror::Error;

use crate::state::{tally::Ballots, timer::Countdown};

/// Guesses granted to an unmasked spy.
pub const SPY_GUESS_ATTEMPTS: u8 = 2;

/// Phases a room can be in. Each variant only carries the data meaningful in it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RoomPhase {
    /// Waiting for the host to start; no secret state exists.
    #[default]
    Lobby,
    /// Free discussion while the round timer runs.
    Playing,
    /// Everyone votes for the participant they suspect.
    Voting {
        /// Ballots cast so far.
        ballots: Ballots,
    },
    /// Tied suspects defend themselves before a revote.
    Defense {
        /// Names tied at the top of the first vote.
        suspects: Vec<String>,
        /// Ballots of the vote that produced the tie.
        votes: Ballots,
        /// Shared defense countdown.
        timer: Countdown,
    },
    /// Non-suspects vote again, restricted to the suspects.
    Revote {
        /// Names tied at the top of the first vote.
        suspects: Vec<String>,
        /// Ballots of the vote that produced the tie.
        votes: Ballots,
        /// Revote ballots cast so far.
        ballots: Ballots,
    },
    /// The spy was unmasked and may try to name the location.
    SpyGuess {
        /// Attempts left before the players win.
        guesses_remaining: u8,
        /// Ballots of the vote that unmasked the spy.
        votes: Ballots,
    },
    /// The round is over and everything is revealed.
    RoundEnd {
        /// How the round ended.
        outcome: RoundOutcome,
        /// Ballots of the first vote, empty when no vote took place.
        votes: Ballots,
    },
}

impl RoomPhase {
    /// Stable snake_case name of the phase.
    pub fn name(&self) -> &'static str {
        match self {
            RoomPhase::Lobby => "lobby",
            RoomPhase::Playing => "playing",
            RoomPhase::Voting { .. } => "voting",
            RoomPhase::Defense { .. } => "defense",
            RoomPhase::Revote { .. } => "revote",
            RoomPhase::SpyGuess { .. } => "spy_guess",
            RoomPhase::RoundEnd { .. } => "round_end",
        }
    }

    /// Whether a round has been dealt and secret roles are in play.
    pub fn is_in_round(&self) -> bool {
        !matches!(self, RoomPhase::Lobby)
    }

    /// Ballots of the first vote of the round, if any were cast.
    fn first_vote(&self) -> Ballots {
        match self {
            RoomPhase::Voting { ballots } => ballots.clone(),
            RoomPhase::Defense { votes, .. }
            | RoomPhase::Revote { votes, .. }
            | RoomPhase::SpyGuess { votes, .. }
            | RoomPhase::RoundEnd { votes, .. } => votes.clone(),
            RoomPhase::Lobby | RoomPhase::Playing => Ballots::new(),
        }
    }
}

/// Terminal result of a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The vote accused someone who was not the spy.
    SpyWinsWrongVote,
    /// The revote tied again.
    SpyWinsRevoteTie,
    /// The unmasked spy named the location.
    SpyWinsCorrectGuess,
    /// The unmasked spy ran out of guesses.
    PlayersWin,
    /// The host evicted the spy mid-round.
    SpyKicked,
}

impl RoundOutcome {
    /// Wire tag of the outcome.
    pub fn tag(&self) -> &'static str {
        match self {
            RoundOutcome::SpyWinsWrongVote => "spy_wins_wrong_vote",
            RoundOutcome::SpyWinsRevoteTie => "spy_wins_revote_tie",
            RoundOutcome::SpyWinsCorrectGuess => "spy_wins_correct_guess",
            RoundOutcome::PlayersWin => "players_win",
            RoundOutcome::SpyKicked => "spy_kicked",
        }
    }
}

/// Events that move a room between phases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomEvent {
    /// A round was dealt from the lobby or after a finished round.
    StartRound,
    /// The host opened a vote.
    CallVote,
    /// The host withdrew the vote.
    CancelVote,
    /// A vote or revote resolved without anyone to accuse.
    ResumeDiscussion,
    /// The vote tied and somebody is left to break the tie.
    OpenDefense {
        /// Names tied at the top.
        suspects: Vec<String>,
    },
    /// The host closed the defense and opened the revote.
    ProceedToRevote,
    /// The accused participant was the spy.
    SpyCaught,
    /// The round ended with the given outcome.
    EndRound(RoundOutcome),
    /// The host abandoned the round.
    ReturnToLobby,
}

impl RoomEvent {
    /// Stable snake_case name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            RoomEvent::StartRound => "start_round",
            RoomEvent::CallVote => "call_vote",
            RoomEvent::CancelVote => "cancel_vote",
            RoomEvent::ResumeDiscussion => "resume_discussion",
            RoomEvent::OpenDefense { .. } => "open_defense",
            RoomEvent::ProceedToRevote => "proceed_to_revote",
            RoomEvent::SpyCaught => "spy_caught",
            RoomEvent::EndRound(_) => "end_round",
            RoomEvent::ReturnToLobby => "return_to_lobby",
        }
    }
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} is not allowed while the room is in {}", .event.name(), .from.name())]
pub struct InvalidTransition {
    /// The phase the room was in when the invalid event was received.
    pub from: RoomPhase,
    /// The event that cannot be applied from this phase.
    pub event: RoomEvent,
}

/// Phase state machine of a single room.
#[derive(Debug, Clone, Default)]
pub struct RoomStateMachine {
    phase: RoomPhase,
    version: usize,
}

impl RoomStateMachine {
    /// Create a state machine initialised in the lobby.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inspect the current phase.
    pub fn phase(&self) -> &RoomPhase {
        &self.phase
    }

    /// Mutable access to the data of the current phase.
    ///
    /// Only phase-local bookkeeping (ballots, defense timer, guess counter) may
    /// change through this handle; phase changes go through [`Self::apply`].
    pub fn phase_mut(&mut self) -> &mut RoomPhase {
        &mut self.phase
    }

    /// Number of transitions applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Validate and apply `event`, returning the new phase.
    pub fn apply(&mut self, event: RoomEvent) -> Result<&RoomPhase, InvalidTransition> {
        let next = self.compute_transition(event)?;
        self.phase = next;
        self.version += 1;
        Ok(&self.phase)
    }

    /// Compute a transition from an event if the transition is valid.
    fn compute_transition(&self, event: RoomEvent) -> Result<RoomPhase, InvalidTransition> {
        let next = match (&self.phase, event) {
            (RoomPhase::Lobby | RoomPhase::RoundEnd { .. }, RoomEvent::StartRound) => {
                RoomPhase::Playing
            }
            (RoomPhase::Playing, RoomEvent::CallVote) => RoomPhase::Voting {
                ballots: Ballots::new(),
            },
            (RoomPhase::Voting { .. }, RoomEvent::CancelVote)
            | (
                RoomPhase::Voting { .. } | RoomPhase::Defense { .. } | RoomPhase::Revote { .. },
                RoomEvent::ResumeDiscussion,
            ) => RoomPhase::Playing,
            (RoomPhase::Voting { ballots }, RoomEvent::OpenDefense { suspects }) => {
                RoomPhase::Defense {
                    suspects,
                    votes: ballots.clone(),
                    timer: Countdown::Idle,
                }
            }
            (RoomPhase::Defense { suspects, votes, .. }, RoomEvent::ProceedToRevote) => {
                RoomPhase::Revote {
                    suspects: suspects.clone(),
                    votes: votes.clone(),
                    ballots: Ballots::new(),
                }
            }
            (
                phase @ (RoomPhase::Voting { .. } | RoomPhase::Defense { .. } | RoomPhase::Revote { .. }),
                RoomEvent::SpyCaught,
            ) => {
                RoomPhase::SpyGuess {
                    guesses_remaining: SPY_GUESS_ATTEMPTS,
                    votes: phase.first_vote(),
                }
            }
            (
                phase @ (RoomPhase::Playing
                | RoomPhase::Voting { .. }
                | RoomPhase::Defense { .. }
                | RoomPhase::Revote { .. }
                | RoomPhase::SpyGuess { .. }),
                RoomEvent::EndRound(outcome),
            ) => RoomPhase::RoundEnd {
                outcome,
                votes: phase.first_vote(),
            },
            (phase, RoomEvent::ReturnToLobby) if phase.is_in_round() => RoomPhase::Lobby,
            (from, event) => {
                return Err(InvalidTransition {
                    from: from.clone(),
                    event,
                });
            }
        };

        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(sm: &mut RoomStateMachine, event: RoomEvent) -> RoomPhase {
        sm.apply(event).unwrap().clone()
    }

    fn record_ballot(sm: &mut RoomStateMachine, voter: &str, target: &str) {
        match sm.phase_mut() {
            RoomPhase::Voting { ballots } | RoomPhase::Revote { ballots, .. } => {
                ballots.insert(voter.into(), target.into());
            }
            other => panic!("no ballots in {other:?}"),
        }
    }

    #[test]
    fn initial_state_is_lobby() {
        let sm = RoomStateMachine::new();
        assert_eq!(sm.phase(), &RoomPhase::Lobby);
        assert_eq!(sm.version(), 0);
    }

    #[test]
    fn full_happy_path_through_round() {
        let mut sm = RoomStateMachine::new();

        assert_eq!(apply(&mut sm, RoomEvent::StartRound), RoomPhase::Playing);
        assert_eq!(
            apply(&mut sm, RoomEvent::CallVote),
            RoomPhase::Voting {
                ballots: Ballots::new()
            }
        );
        record_ballot(&mut sm, "Ann", "Bob");
        match apply(&mut sm, RoomEvent::SpyCaught) {
            RoomPhase::SpyGuess {
                guesses_remaining,
                votes,
            } => {
                assert_eq!(guesses_remaining, SPY_GUESS_ATTEMPTS);
                assert_eq!(votes.get("Ann").map(String::as_str), Some("Bob"));
            }
            other => panic!("expected spy guess, got {other:?}"),
        }
        assert!(matches!(
            apply(&mut sm, RoomEvent::EndRound(RoundOutcome::PlayersWin)),
            RoomPhase::RoundEnd {
                outcome: RoundOutcome::PlayersWin,
                ..
            }
        ));
        assert_eq!(apply(&mut sm, RoomEvent::StartRound), RoomPhase::Playing);
        assert_eq!(sm.version(), 5);
    }

    #[test]
    fn tie_path_keeps_first_vote_through_revote() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::StartRound);
        apply(&mut sm, RoomEvent::CallVote);
        record_ballot(&mut sm, "Ann", "Bob");
        record_ballot(&mut sm, "Cid", "Dee");

        let defense = apply(
            &mut sm,
            RoomEvent::OpenDefense {
                suspects: vec!["Bob".into(), "Dee".into()],
            },
        );
        assert!(matches!(
            defense,
            RoomPhase::Defense {
                timer: Countdown::Idle,
                ..
            }
        ));

        match apply(&mut sm, RoomEvent::ProceedToRevote) {
            RoomPhase::Revote {
                suspects,
                votes,
                ballots,
            } => {
                assert_eq!(suspects, vec!["Bob".to_string(), "Dee".to_string()]);
                assert_eq!(votes.len(), 2);
                assert!(ballots.is_empty());
            }
            other => panic!("expected revote, got {other:?}"),
        }

        match apply(&mut sm, RoomEvent::EndRound(RoundOutcome::SpyWinsRevoteTie)) {
            RoomPhase::RoundEnd { outcome, votes } => {
                assert_eq!(outcome, RoundOutcome::SpyWinsRevoteTie);
                assert_eq!(votes.len(), 2);
            }
            other => panic!("expected round end, got {other:?}"),
        }
    }

    #[test]
    fn cancel_and_resume_return_to_playing() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::StartRound);
        apply(&mut sm, RoomEvent::CallVote);
        assert_eq!(apply(&mut sm, RoomEvent::CancelVote), RoomPhase::Playing);
        apply(&mut sm, RoomEvent::CallVote);
        assert_eq!(
            apply(&mut sm, RoomEvent::ResumeDiscussion),
            RoomPhase::Playing
        );
    }

    #[test]
    fn stale_vote_events_are_rejected_after_phase_change() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::StartRound);
        apply(&mut sm, RoomEvent::CallVote);
        apply(&mut sm, RoomEvent::CancelVote);

        let err = sm.apply(RoomEvent::CancelVote).unwrap_err();
        assert_eq!(err.from, RoomPhase::Playing);
        assert_eq!(err.event, RoomEvent::CancelVote);
        assert_eq!(
            err.to_string(),
            "cancel_vote is not allowed while the room is in playing"
        );
    }

    #[test]
    fn return_to_lobby_is_rejected_in_lobby() {
        let mut sm = RoomStateMachine::new();
        assert!(sm.apply(RoomEvent::ReturnToLobby).is_err());

        apply(&mut sm, RoomEvent::StartRound);
        apply(&mut sm, RoomEvent::CallVote);
        assert_eq!(apply(&mut sm, RoomEvent::ReturnToLobby), RoomPhase::Lobby);
    }

    #[test]
    fn start_round_requires_lobby_or_round_end() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::StartRound);
        assert!(sm.apply(RoomEvent::StartRound).is_err());
        assert_eq!(sm.version(), 1);
    }

    #[test]
    fn defense_can_resolve_without_revote() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::StartRound);
        apply(&mut sm, RoomEvent::CallVote);
        record_ballot(&mut sm, "Ann", "Bob");
        let suspects = vec!["Bob".to_string(), "Cid".to_string()];
        apply(
            &mut sm,
            RoomEvent::OpenDefense {
                suspects: suspects.clone(),
            },
        );

        match apply(&mut sm, RoomEvent::SpyCaught) {
            RoomPhase::SpyGuess { votes, .. } => assert_eq!(votes.len(), 1),
            other => panic!("expected spy guess, got {other:?}"),
        }

        apply(&mut sm, RoomEvent::ReturnToLobby);
        apply(&mut sm, RoomEvent::StartRound);
        apply(&mut sm, RoomEvent::CallVote);
        apply(&mut sm, RoomEvent::OpenDefense { suspects });
        assert_eq!(
            apply(&mut sm, RoomEvent::ResumeDiscussion),
            RoomPhase::Playing
        );
    }

    #[test]
    fn spy_kicked_while_playing_ends_round_without_votes() {
        let mut sm = RoomStateMachine::new();
        apply(&mut sm, RoomEvent::StartRound);
        match apply(&mut sm, RoomEvent::EndRound(RoundOutcome::SpyKicked)) {
            RoomPhase::RoundEnd { outcome, votes } => {
                assert_eq!(outcome, RoundOutcome::SpyKicked);
                assert!(votes.is_empty());
            }
            other => panic!("expected round end, got {other:?}"),
        }
    }
}
