use time::{Duration, OffsetDateTime};

/// Host-driven countdown read on demand against the wall clock.
///
/// A countdown is either idle, running towards a deadline, or paused with a
/// remainder; it can never hold a deadline and a remainder at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Countdown {
    /// Never started since the last reset.
    #[default]
    Idle,
    /// Counting down towards `deadline`.
    Running {
        /// Wall-clock instant at which the countdown reaches zero.
        deadline: OffsetDateTime,
    },
    /// Stopped with `remaining_secs` left on the clock.
    Paused {
        /// Whole seconds left when the countdown was paused.
        remaining_secs: u64,
    },
}

impl Countdown {
    /// Start or resume the countdown.
    ///
    /// A paused countdown resumes from its remainder; otherwise it restarts
    /// with the full `duration_secs`.
    pub fn start(&mut self, duration_secs: u64, now: OffsetDateTime) {
        let secs = match *self {
            Countdown::Paused { remaining_secs } => remaining_secs,
            _ => duration_secs,
        };
        *self = Countdown::Running {
            deadline: now + Duration::seconds(secs as i64),
        };
    }

    /// Freeze a running countdown, keeping the whole seconds left.
    pub fn pause(&mut self, now: OffsetDateTime) {
        if let Countdown::Running { deadline } = *self {
            *self = Countdown::Paused {
                remaining_secs: remaining_secs(deadline, now),
            };
        }
    }

    /// Deadline while running.
    pub fn deadline(&self) -> Option<OffsetDateTime> {
        match self {
            Countdown::Running { deadline } => Some(*deadline),
            _ => None,
        }
    }

    /// Stored remainder while paused.
    pub fn paused_remaining(&self) -> Option<u64> {
        match self {
            Countdown::Paused { remaining_secs } => Some(*remaining_secs),
            _ => None,
        }
    }
}

fn remaining_secs(deadline: OffsetDateTime, now: OffsetDateTime) -> u64 {
    (deadline - now).whole_seconds().max(0) as u64
}
