//! Simulation time for the dosing loop.
//!
//! The host advances the loop one whole minute per call, starting at minute
//! zero. Dosing decisions run on a coarser 5-minute cadence layered on top of
//! that per-minute feed; [`CyclePhase`] names where a call falls within the
//! cadence. [`SimClock`] anchors a run to a wall-clock epoch so histories and
//! engine payloads can carry real timestamps.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Minutes between consultations of the external decision engine.
pub const DECISION_CYCLE_MIN: i64 = 5;

/// Discrete simulation time: whole minutes since the start of a run.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SimTime(i64);

impl SimTime {
    /// The start of a run.
    pub const ZERO: Self = Self(0);

    /// Creates a simulation time from a minute count.
    #[must_use]
    pub const fn from_minutes(minutes: i64) -> Self {
        Self(minutes)
    }

    /// Returns the minute count.
    #[must_use]
    pub const fn minutes(self) -> i64 {
        self.0
    }

    /// Returns this time shifted by the given number of minutes.
    ///
    /// Used for bolus lookahead, where the offset may reach into the future.
    #[must_use]
    pub const fn offset(self, minutes: i64) -> Self {
        Self(self.0 + minutes)
    }

    /// Where this minute falls within the decision cadence.
    #[must_use]
    pub const fn cycle_phase(self) -> CyclePhase {
        if self.0 % DECISION_CYCLE_MIN == 0 {
            CyclePhase::CycleDue
        } else {
            CyclePhase::AwaitingCycle
        }
    }

    /// True when the decision engine is consulted at this minute.
    #[must_use]
    pub const fn is_cycle_due(self) -> bool {
        matches!(self.cycle_phase(), CyclePhase::CycleDue)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a call falls within the 5-minute decision cadence.
///
/// The phase is purely a function of the minute count; nothing external can
/// trigger a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Minutes 1-4 of a window; the last decision stays in force.
    AwaitingCycle,
    /// Minute divisible by 5; a fresh decision is requested.
    CycleDue,
}

/// Maps simulation minutes onto wall-clock timestamps for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimClock {
    epoch: DateTime<Utc>,
}

impl SimClock {
    /// Anchors a clock at the current wall-clock time.
    #[must_use]
    pub fn starting_now() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchors a clock at a fixed epoch, for deterministic runs.
    #[must_use]
    pub const fn anchored_at(epoch: DateTime<Utc>) -> Self {
        Self { epoch }
    }

    /// The wall-clock time of simulation minute zero.
    #[must_use]
    pub const fn epoch(&self) -> DateTime<Utc> {
        self.epoch
    }

    /// The wall-clock time of the given simulation minute.
    #[must_use]
    pub fn wall(&self, t: SimTime) -> DateTime<Utc> {
        self.epoch + Duration::minutes(t.minutes())
    }
}
