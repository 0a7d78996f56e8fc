//! Run identity used as the cancellation token of the engine.
//!
//! A [`RunId`] is minted every time a run starts and every time the system
//! is reset. Work that belongs to a run captures its id and compares it to
//! the current one before producing any effect; a mismatch means the run
//! was superseded.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Monotonically increasing identity of a simulation run.
///
/// The initial identity (`RunId::INITIAL`) belongs to no run. Every mint
/// produces a value strictly greater than all previous ones.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct RunId(pub u64);

impl RunId {
    /// The identity current before anything has been minted.
    pub const INITIAL: Self = Self(0);

    /// Return the identity that follows this one.
    ///
    /// Saturates at `u64::MAX`, which no realistic session reaches.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl core::fmt::Display for RunId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_is_strictly_greater() {
        let first = RunId::INITIAL;
        let second = first.next();
        assert!(second > first);
        assert!(second.next() > second);
    }

    #[test]
    fn serializes_as_plain_number() {
        let json = serde_json::to_string(&RunId(7)).ok();
        assert_eq!(json.as_deref(), Some("7"));
    }

    #[test]
    fn display_is_prefixed() {
        assert_eq!(RunId(3).to_string(), "run-3");
    }
}
