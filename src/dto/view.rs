use std::collections::BTreeMap;

use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dto::{format_timestamp, phase::VisiblePhase},
    state::{tally::Ballots, timer::Countdown},
};

/// Personalised snapshot of a room, as seen by one participant.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerView {
    /// Revision of the room this view was built from.
    pub seq: u64,
    /// Code other players use to join.
    pub room_code: String,
    /// Phase as shown to clients.
    pub phase: VisiblePhase,
    /// Roster in join order.
    pub players: Vec<PlayerSummary>,
    /// Rounds dealt since the last return to the lobby.
    pub round_number: u32,
    /// Length of a round in minutes.
    pub round_minutes: u32,
    /// Round countdown.
    pub timer: TimerView,
    /// Whether the viewer holds host authority.
    pub is_host: bool,
    /// The viewer's display name.
    pub my_name: String,
    /// Secrets dealt to the viewer, present once a round is dealt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round: Option<RoundView>,
    /// Progress of the open vote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voting: Option<VotingView>,
    /// Tie-break defense state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defense: Option<DefenseView>,
    /// Progress of the revote.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revote: Option<RevoteView>,
    /// State of the spy's last chance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spy_guess: Option<SpyGuessView>,
    /// Everything revealed once the round is over.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub round_end: Option<RoundEndView>,
}

/// Public roster entry.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PlayerSummary {
    /// Display name.
    pub name: String,
    /// Whether this participant is the host.
    pub is_host: bool,
    /// Whether the participant currently has a live connection.
    pub connected: bool,
}

/// Countdown state: at most one of the two fields is set.
#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct TimerView {
    /// RFC 3339 deadline while the countdown runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    /// Whole seconds left while paused.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paused_remaining_secs: Option<u64>,
}

impl From<&Countdown> for TimerView {
    fn from(value: &Countdown) -> Self {
        Self {
            deadline: value.deadline().map(format_timestamp),
            paused_remaining_secs: value.paused_remaining(),
        }
    }
}

/// The viewer's own card and private scratch state.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundView {
    /// Whether the viewer is the spy.
    pub is_spy: bool,
    /// `"SPY"` for the spy, otherwise the role at the location.
    pub role: Option<String>,
    /// Secret location, absent for the spy.
    pub location: Option<String>,
    /// Every location of the catalog, alphabetically.
    pub all_locations: Vec<String>,
    /// Locations the viewer crossed off.
    pub eliminated_locations: Vec<String>,
    /// The viewer's private notes, keyed by participant name.
    pub notes: BTreeMap<String, String>,
}

/// Progress of an open vote.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct VotingView {
    /// Names of participants who already voted.
    pub voted_players: Vec<String>,
    /// The viewer's own ballot, if cast.
    pub my_vote: Option<String>,
}

/// One ballot of a finished vote.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BallotView {
    /// Participant who cast the ballot.
    pub voter: String,
    /// Participant named on the ballot.
    pub target: String,
}

/// Tied suspects defending themselves.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DefenseView {
    /// Names tied at the top of the vote.
    pub tied_suspects: Vec<String>,
    /// Whether the viewer is one of them.
    pub is_suspect: bool,
    /// Shared defense countdown.
    pub timer: TimerView,
    /// Ballots of the vote that produced the tie.
    pub first_round_votes: Vec<BallotView>,
}

/// Progress of a revote between tied suspects.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RevoteView {
    /// Names the revote is restricted to.
    pub tied_suspects: Vec<String>,
    /// Whether the viewer is one of them.
    pub is_suspect: bool,
    /// Whether the viewer may cast a revote ballot.
    pub can_revote: bool,
    /// Names of participants who already revoted.
    pub voted_players: Vec<String>,
    /// The viewer's own revote ballot, if cast.
    pub my_revote: Option<String>,
}

/// The unmasked spy's last chance.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SpyGuessView {
    /// Attempts the spy has left.
    pub guesses_remaining: u8,
    /// Whether the viewer is the spy.
    pub can_guess: bool,
}

/// Final reveal of a round.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RoundEndView {
    /// Name of the round's spy.
    pub spy_name: String,
    /// Secret location of the round.
    pub location: String,
    /// Outcome tag such as `players_win`.
    pub outcome: String,
    /// Ballots of the first vote of the round.
    pub votes: Vec<BallotView>,
}

/// Flatten ballots into voter/target pairs, keeping cast order.
pub fn ballot_views(ballots: &Ballots) -> Vec<BallotView> {
    ballots
        .iter()
        .map(|(voter, target)| BallotView {
            voter: voter.clone(),
            target: target.clone(),
        })
        .collect()
}
