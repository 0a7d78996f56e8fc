//! Speed control: the mapping between wall-clock and simulated time.
//!
//! The [`SpeedController`] is the single source of truth for the current
//! time-compression factor. Every wait poll reads the live value, so a
//! change takes effect on the very next poll of every pending wait.
//!
//! # Design Principles
//!
//! - The multiplier is never captured at wait start; readers always go
//!   through [`SpeedController::current`].
//! - Speed changes alter how fast wall-clock time consumes the simulated
//!   budget, never the budget itself.

use std::sync::atomic::{AtomicU8, Ordering};
use std::time::Duration;

use aquaflow_types::SpeedMultiplier;

/// Lock-free holder of the live speed multiplier.
#[derive(Debug)]
pub struct SpeedController {
    /// Index into [`SpeedMultiplier::ALL`].
    index: AtomicU8,
}

impl SpeedController {
    /// Create a controller starting at `initial`.
    pub const fn new(initial: SpeedMultiplier) -> Self {
        Self {
            index: AtomicU8::new(initial.index()),
        }
    }

    /// Return the multiplier in effect right now.
    pub fn current(&self) -> SpeedMultiplier {
        SpeedMultiplier::from_index(self.index.load(Ordering::Acquire))
    }

    /// Replace the multiplier. Returns the previous one.
    pub fn set_speed(&self, speed: SpeedMultiplier) -> SpeedMultiplier {
        let prev = self.index.swap(speed.index(), Ordering::AcqRel);
        SpeedMultiplier::from_index(prev)
    }

    /// Advance to the next multiplier in the cycle, wrapping to 1x.
    /// Returns the new multiplier.
    pub fn cycle(&self) -> SpeedMultiplier {
        let advance = |raw: u8| Some(SpeedMultiplier::from_index(raw).next().index());
        // The closure never returns `None`, so both arms carry the previous value.
        let prev = self
            .index
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, advance)
            .unwrap_or_else(|raw| raw);
        SpeedMultiplier::from_index(prev).next()
    }

    /// Wall-clock time that `nominal` simulated time takes at the current
    /// speed (`nominal / multiplier`).
    pub fn to_simulated_duration(&self, nominal: Duration) -> Duration {
        nominal
            .checked_div(self.current().factor())
            .unwrap_or(nominal)
    }

    /// Simulated time consumed by one wall-clock `poll` at the current speed.
    pub fn simulated_quantum(&self, poll: Duration) -> Duration {
        poll.saturating_mul(self.current().factor())
    }
}

impl Default for SpeedController {
    fn default() -> Self {
        Self::new(SpeedMultiplier::X1)
    }
}
