//! Countdown of the simulated seconds left in a run.
//!
//! The tracker waits out the run's simulated budget through the same
//! [`wait`](crate::wait::wait) primitive the stages use, so it follows the
//! same speed controller and poll cadence but keeps its own credit. It is
//! tied to its run identity exactly like a stage wait: a poll for a
//! superseded run stops the task.
//!
//! While the run is running the displayed value never drops below one.
//! Zero is written only by the completion transition, so the countdown
//! reaches zero exactly when the final stage completes.

use std::sync::Arc;
use std::time::Duration;

use aquaflow_types::RunId;
use tracing::debug;

use crate::context::SimulationContext;
use crate::wait::{self, Cancelled};

/// Count `remaining_seconds` down over `budget` of simulated time.
///
/// Each poll rewrites the value as the whole simulated seconds still left,
/// rounded up and floored at one. Polls after the run stopped running have
/// no effect.
///
/// # Errors
///
/// Returns [`Cancelled`] when `run_id` is superseded.
pub async fn track_remaining(
    ctx: Arc<SimulationContext>,
    run_id: RunId,
    budget: Duration,
) -> Result<(), Cancelled> {
    wait::wait(&ctx, budget, run_id, |state, tick| {
        if state.phase().is_running() {
            state.readings_mut().remaining_seconds = whole_seconds(tick.remaining()).max(1);
        }
    })
    .await?;

    debug!(%run_id, "countdown finished");
    Ok(())
}

/// `duration` in seconds, rounded up.
fn whole_seconds(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis().div_ceil(1000)).unwrap_or(u64::MAX)
}
