//! The cancellable, speed-scaled wait that underlies every stage.
//!
//! [`wait`] sleeps a fixed real-time poll interval, then credits
//! `poll_interval * live_multiplier` of simulated time. Because the
//! multiplier is re-read on every poll, a speed change mid-wait takes effect
//! immediately without restarting the wait.
//!
//! After each poll the wait locks the [`RunState`], compares the captured
//! [`RunId`] with the current one and only then hands the state to the
//! caller's `on_poll` closure. A mismatch returns [`Cancelled`] before any
//! effect happens.

use std::time::Duration;

use aquaflow_types::RunId;

use crate::context::{RunState, SimulationContext};
use crate::curve;

/// The run that owned a wait was superseded by a newer identity.
///
/// This is the normal way a cancelled run unwinds, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{captured} superseded by {current}")]
pub struct Cancelled {
    /// Identity the waiting work was started with.
    pub captured: RunId,
    /// Identity that was current when the mismatch was detected.
    pub current: RunId,
}

/// Progress handed to the `on_poll` closure of [`wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTick {
    /// Simulated time credited so far, clamped to `nominal`.
    pub elapsed: Duration,
    /// Simulated length of the wait.
    pub nominal: Duration,
}

impl WaitTick {
    /// Whether this is the poll that resolves the wait.
    pub fn is_final(&self) -> bool {
        self.elapsed >= self.nominal
    }

    /// Fraction of the wait completed, in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        curve::progress_fraction(self.nominal, self.elapsed)
    }

    /// Simulated time still to go.
    pub const fn remaining(&self) -> Duration {
        self.nominal.saturating_sub(self.elapsed)
    }
}

/// Wait `nominal` simulated time on behalf of `run_id`.
///
/// `on_poll` runs once per poll while the identity still matches, with the
/// state lock held. The final call has `elapsed == nominal` exactly. An
/// arrival wait with no per-poll effect passes a no-op closure.
///
/// Returns the unclamped simulated time credited, which is at least
/// `nominal` and less than `nominal` plus one poll quantum.
///
/// # Errors
///
/// Returns [`Cancelled`] as soon as a poll observes a different current
/// identity. `on_poll` is not called for that poll.
pub async fn wait<F>(
    ctx: &SimulationContext,
    nominal: Duration,
    run_id: RunId,
    on_poll: F,
) -> Result<Duration, Cancelled>
where
    F: FnMut(&mut RunState, WaitTick) + Send,
{
    wait_from(ctx, nominal, Duration::ZERO, run_id, on_poll).await
}

/// Like [`wait`], but starts with `carried` simulated time already
/// credited.
///
/// Sequential waits pass the overshoot of the previous wait
/// (`credited - nominal`) so a fast poll quantum is spent across stages
/// instead of being dropped at each boundary. When `carried` already covers
/// `nominal` the wait resolves without sleeping, with a single final tick.
///
/// Returns the total credited time, `carried` included.
///
/// # Errors
///
/// Returns [`Cancelled`] as soon as a poll observes a different current
/// identity.
pub async fn wait_from<F>(
    ctx: &SimulationContext,
    nominal: Duration,
    carried: Duration,
    run_id: RunId,
    mut on_poll: F,
) -> Result<Duration, Cancelled>
where
    F: FnMut(&mut RunState, WaitTick) + Send,
{
    let poll = ctx.poll_interval();
    let mut credited = carried;

    loop {
        if credited < nominal {
            tokio::time::sleep(poll).await;
            credited = credited.saturating_add(ctx.speed().simulated_quantum(poll));
        }

        let mut state = ctx.lock().await;
        check_identity(&state, run_id)?;
        on_poll(
            &mut state,
            WaitTick {
                elapsed: credited.min(nominal),
                nominal,
            },
        );
        if credited >= nominal {
            return Ok(credited);
        }
    }
}

fn check_identity(state: &RunState, captured: RunId) -> Result<(), Cancelled> {
    let current = state.run_id();
    if current == captured {
        Ok(())
    } else {
        Err(Cancelled { captured, current })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use aquaflow_types::{Readings, SpeedMultiplier};
    use tokio::time::Instant;

    use super::*;
    use crate::clock::SpeedController;
    use crate::config::FilterConfig;
    use crate::filter::FilterWearModel;
    use crate::sink::NoOpSink;

    const POLL: Duration = Duration::from_millis(100);

    fn make_context(speed: SpeedMultiplier) -> Arc<SimulationContext> {
        Arc::new(SimulationContext::new(
            SpeedController::new(speed),
            POLL,
            RunState::new(
                Readings::raw(50.0, 7.0, 10),
                FilterWearModel::new(&FilterConfig::default()),
            ),
            Arc::new(NoOpSink),
        ))
    }

    async fn mint(ctx: &SimulationContext) -> RunId {
        ctx.lock().await.mint_run_id()
    }

    async fn idle_wait(
        ctx: &SimulationContext,
        nominal: Duration,
        run_id: RunId,
    ) -> Result<Duration, Cancelled> {
        wait(ctx, nominal, run_id, |_, _| {}).await
    }

    #[tokio::test(start_paused = true)]
    async fn resolves_within_one_quantum_at_every_speed() {
        for speed in SpeedMultiplier::ALL {
            for nominal_ms in [1_u64, 250, 1000, 2500, 123_456] {
                let ctx = make_context(speed);
                let run_id = mint(&ctx).await;
                let nominal = Duration::from_millis(nominal_ms);
                let credited = idle_wait(&ctx, nominal, run_id).await.unwrap();
                let quantum = ctx.speed().simulated_quantum(POLL);
                assert!(credited >= nominal, "{speed}: {credited:?} < {nominal:?}");
                assert!(
                    credited < nominal + quantum,
                    "{speed}: {credited:?} >= {nominal:?} + {quantum:?}"
                );
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn wall_clock_scales_with_speed() {
        let ctx = make_context(SpeedMultiplier::X10);
        let run_id = mint(&ctx).await;
        let started = Instant::now();
        idle_wait(&ctx, Duration::from_secs(10), run_id)
            .await
            .unwrap();
        let wall = started.elapsed();
        assert!(wall >= Duration::from_secs(1) && wall < Duration::from_millis(1010), "{wall:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn final_tick_is_clamped_to_nominal() {
        let ctx = make_context(SpeedMultiplier::X1000);
        let run_id = mint(&ctx).await;
        let mut ticks = Vec::new();
        wait(&ctx, Duration::from_millis(2500), run_id, |_, tick| {
            ticks.push(tick);
        })
        .await
        .unwrap();
        assert_eq!(ticks.len(), 1);
        let last = ticks.last().unwrap();
        assert!(last.is_final());
        assert_eq!(last.elapsed, last.nominal);
        assert_eq!(last.remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn speed_change_mid_wait_keeps_simulated_budget() {
        let ctx = make_context(SpeedMultiplier::X1);
        let run_id = mint(&ctx).await;
        let nominal = Duration::from_secs(10);

        let waiter = {
            let ctx = Arc::clone(&ctx);
            tokio::spawn(async move {
                let started = Instant::now();
                let credited = idle_wait(&ctx, nominal, run_id).await;
                (credited, started.elapsed())
            })
        };

        // Two simulated seconds at 1x, then jump to 100x.
        tokio::time::sleep(Duration::from_millis(2050)).await;
        ctx.speed().set_speed(SpeedMultiplier::X100);

        let (credited, wall) = waiter.await.unwrap();
        let credited = credited.unwrap();
        assert!(credited >= nominal);
        // At 1x the wait would have taken 10 s of wall-clock time.
        assert!(
            wall >= Duration::from_millis(2100) && wall < Duration::from_millis(2200),
            "{wall:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn superseded_identity_cancels_without_effect() {
        let ctx = make_context(SpeedMultiplier::X1);
        let run_id = mint(&ctx).await;
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let waiter = {
            let ctx = Arc::clone(&ctx);
            let calls = Arc::clone(&calls);
            tokio::spawn(async move {
                wait(&ctx, Duration::from_secs(5), run_id, |_, _| {
                    calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                })
                .await
            })
        };

        tokio::time::sleep(Duration::from_millis(350)).await;
        let newer = mint(&ctx).await;
        let seen = calls.load(std::sync::atomic::Ordering::SeqCst);

        let result = waiter.await.unwrap();
        assert_eq!(
            result,
            Err(Cancelled {
                captured: run_id,
                current: newer
            })
        );
        assert_eq!(seen, 3);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn carried_time_covering_nominal_resolves_immediately() {
        let ctx = make_context(SpeedMultiplier::X1);
        let run_id = mint(&ctx).await;
        let started = Instant::now();
        let mut ticks = Vec::new();

        let credited = wait_from(
            &ctx,
            Duration::from_millis(1500),
            Duration::from_secs(9),
            run_id,
            |_, tick| ticks.push(tick),
        )
        .await
        .unwrap();

        assert_eq!(started.elapsed(), Duration::ZERO);
        assert_eq!(credited, Duration::from_secs(9));
        assert_eq!(ticks.len(), 1);
        assert!(ticks.first().unwrap().is_final());
    }

    #[tokio::test(start_paused = true)]
    async fn carried_time_shortens_the_wait() {
        let ctx = make_context(SpeedMultiplier::X1);
        let run_id = mint(&ctx).await;
        let started = Instant::now();

        let credited = wait_from(
            &ctx,
            Duration::from_millis(1000),
            Duration::from_millis(700),
            run_id,
            |_, _| {},
        )
        .await
        .unwrap();

        assert_eq!(credited, Duration::from_millis(1000));
        let wall = started.elapsed();
        assert!(
            wall >= Duration::from_millis(300) && wall < Duration::from_millis(310),
            "{wall:?}"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn carried_wait_still_checks_identity() {
        let ctx = make_context(SpeedMultiplier::X1);
        let run_id = mint(&ctx).await;
        let newer = mint(&ctx).await;
        let result = wait_from(
            &ctx,
            Duration::from_secs(1),
            Duration::from_secs(5),
            run_id,
            |_, _| panic!("stale wait must not run its effect"),
        )
        .await;
        assert_eq!(
            result,
            Err(Cancelled {
                captured: run_id,
                current: newer
            })
        );
    }
}
