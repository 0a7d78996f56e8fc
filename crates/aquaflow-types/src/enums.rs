//! Enumeration types for the Aquaflow simulation.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Speed
// ---------------------------------------------------------------------------

/// Error returned when a number is not one of the supported multipliers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported speed multiplier {0} (expected 1, 10, 100 or 1000)")]
pub struct InvalidSpeed(pub u32);

/// Time-compression factor applied to every nominal stage duration.
///
/// The set is fixed and escalating; [`SpeedMultiplier::next`] cycles
/// through it and wraps back to `X1`. On the wire the multiplier is the
/// plain factor (`1`, `10`, `100`, `1000`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum SpeedMultiplier {
    /// Real time.
    #[default]
    X1,
    /// Ten times faster than real time.
    X10,
    /// One hundred times faster than real time.
    X100,
    /// One thousand times faster than real time.
    X1000,
}

impl SpeedMultiplier {
    /// Every multiplier, in cycling order.
    pub const ALL: [Self; 4] = [Self::X1, Self::X10, Self::X100, Self::X1000];

    /// Return the numeric compression factor.
    pub const fn factor(self) -> u32 {
        match self {
            Self::X1 => 1,
            Self::X10 => 10,
            Self::X100 => 100,
            Self::X1000 => 1000,
        }
    }

    /// Return the next multiplier in the cycle, wrapping to `X1`.
    #[must_use]
    pub const fn next(self) -> Self {
        match self {
            Self::X1 => Self::X10,
            Self::X10 => Self::X100,
            Self::X100 => Self::X1000,
            Self::X1000 => Self::X1,
        }
    }

    /// Position of this multiplier in [`SpeedMultiplier::ALL`].
    pub const fn index(self) -> u8 {
        match self {
            Self::X1 => 0,
            Self::X10 => 1,
            Self::X100 => 2,
            Self::X1000 => 3,
        }
    }

    /// Inverse of [`SpeedMultiplier::index`]. Out-of-range values map to `X1`.
    pub const fn from_index(index: u8) -> Self {
        match index {
            1 => Self::X10,
            2 => Self::X100,
            3 => Self::X1000,
            _ => Self::X1,
        }
    }
}

impl TryFrom<u32> for SpeedMultiplier {
    type Error = InvalidSpeed;

    fn try_from(factor: u32) -> Result<Self, Self::Error> {
        match factor {
            1 => Ok(Self::X1),
            10 => Ok(Self::X10),
            100 => Ok(Self::X100),
            1000 => Ok(Self::X1000),
            other => Err(InvalidSpeed(other)),
        }
    }
}

impl From<SpeedMultiplier> for u32 {
    fn from(speed: SpeedMultiplier) -> Self {
        speed.factor()
    }
}

impl core::fmt::Display for SpeedMultiplier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x", self.factor())
    }
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// Lifecycle phase of the run controller.
///
/// `Idle -> Running -> Completed`, with a reset returning any phase to
/// `Idle`. A new run may start from `Idle` or `Completed` only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "state", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum RunPhase {
    /// No run in progress; readings show raw water.
    #[default]
    Idle,
    /// A run is executing the stage at `stage_index`.
    Running {
        /// Zero-based index into the stage plan.
        stage_index: usize,
    },
    /// The last run went through every stage.
    Completed,
}

impl RunPhase {
    /// Whether a run is currently executing.
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Severity of an operator log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LogLevel {
    /// Routine progress message.
    Info,
    /// A run finished with approved water.
    Success,
    /// Something the operator should act on (worn filter, rejected batch).
    Warning,
}

/// Outcome of the final quality test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Verdict {
    /// Final concentration is under the approval limit.
    Approved,
    /// Final concentration is at or above the approval limit.
    Rejected,
}
