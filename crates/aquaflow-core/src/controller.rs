//! Run controller: the treatment state machine.
//!
//! [`RunController`] owns the current [`RunId`], walks the
//! [`StageSequencer`] inside a spawned run task, and turns operator
//! commands into state transitions:
//!
//! - **Start**: allowed from `Idle` or `Completed`; a no-op while running
//! - **Cancel / reset**: mints a new identity, which silently retires any
//!   in-flight wait, and clears per-run state
//! - **Cycle speed**: applies to every pending wait on its next poll
//! - **Regenerate filter**: resets filter wear at any time
//!
//! There are no runtime errors in this domain. A superseded run unwinds
//! through [`Cancelled`] and ends as [`RunOutcome::Cancelled`].

use std::sync::Arc;
use std::time::Duration;

use aquaflow_types::{
    ConcentrationSample, EngineFrame, LogEntry, LogLevel, Readings, RunId, RunPhase,
    SpeedMultiplier, StageStatus, TransitionProgress, Verdict,
};
use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::clock::SpeedController;
use crate::config::{AquaflowConfig, ConfigError, WaterConfig};
use crate::context::{RunState, SimulationContext};
use crate::curve;
use crate::filter::FilterWearModel;
use crate::remaining;
use crate::sink::FrameSink;
use crate::stage::{Stage, StageKind, StageSequencer};
use crate::wait::{self, Cancelled, WaitTick};

/// How a run task ended.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RunOutcome {
    /// Every stage ran; totals and filter wear were updated.
    Completed {
        /// Result of the quality test.
        verdict: Verdict,
        /// Concentration at the end of the run, in ppm.
        final_ppm: f64,
    },
    /// The run was superseded by a reset or restart.
    Cancelled,
}

/// Handle to a started run.
#[derive(Debug)]
pub struct RunHandle {
    /// Identity minted for the run.
    pub run_id: RunId,
    task: JoinHandle<RunOutcome>,
}

impl RunHandle {
    /// Wait for the run task to end.
    ///
    /// A task that panicked or was aborted reports [`RunOutcome::Cancelled`].
    pub async fn outcome(self) -> RunOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(run_id = %self.run_id, error = %e, "run task did not finish");
                RunOutcome::Cancelled
            }
        }
    }
}

/// Water properties and batch accounting used by every run.
#[derive(Debug, Clone, PartialEq)]
pub struct TreatmentProfile {
    /// Untreated water.
    pub water: WaterConfig,
    /// Liters added to the totals per completed run.
    pub batch_volume_liters: u64,
    /// Cost added to the totals per completed run.
    pub batch_cost: Decimal,
}

/// Immutable inputs of a run task.
#[derive(Debug)]
struct RunPlan {
    stages: StageSequencer,
    profile: TreatmentProfile,
}

impl RunPlan {
    fn raw_readings(&self) -> Readings {
        Readings::raw(
            self.profile.water.raw_ppm,
            self.profile.water.raw_ph,
            self.stages.total_seconds(),
        )
    }
}

/// Drives runs through the stage plan and arbitrates cancellation.
#[derive(Debug, Clone)]
pub struct RunController {
    ctx: Arc<SimulationContext>,
    plan: Arc<RunPlan>,
}

impl RunController {
    /// Build a controller from validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn from_config(config: &AquaflowConfig, sink: Arc<dyn FrameSink>) -> Result<Self, ConfigError> {
        config.validate()?;
        let profile = TreatmentProfile {
            water: config.water,
            batch_volume_liters: config.batch.volume_liters,
            batch_cost: config.batch.cost,
        };
        Ok(Self::new(
            config.stage_plan()?,
            profile,
            FilterWearModel::new(&config.filter),
            SpeedController::new(config.engine.initial_speed),
            config.engine.poll_interval(),
            sink,
        ))
    }

    /// Build a controller from parts.
    pub fn new(
        stages: StageSequencer,
        profile: TreatmentProfile,
        filter: FilterWearModel,
        speed: SpeedController,
        poll_interval: Duration,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        let plan = RunPlan { stages, profile };
        let state = RunState::new(plan.raw_readings(), filter);
        let ctx = SimulationContext::new(speed, poll_interval, state, sink);
        Self {
            ctx: Arc::new(ctx),
            plan: Arc::new(plan),
        }
    }

    /// The shared simulation context.
    pub fn context(&self) -> &Arc<SimulationContext> {
        &self.ctx
    }

    /// The stage plan.
    pub fn stages(&self) -> &StageSequencer {
        &self.plan.stages
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Start a run.
    ///
    /// Returns `None` without any effect if a run is already in progress.
    /// Otherwise mints a new identity, clears the samples, resets readings
    /// and the time budget, and spawns the run and countdown tasks.
    pub async fn start(&self) -> Option<RunHandle> {
        let run_id = {
            let mut state = self.ctx.lock().await;
            if state.phase().is_running() {
                debug!(run_id = %state.run_id(), "start ignored, run in progress");
                return None;
            }
            let run_id = state.mint_run_id();
            state.recorder_mut().clear();
            *state.readings_mut() = self.plan.raw_readings();
            state.set_phase(RunPhase::Running { stage_index: 0 });
            self.ctx.write_log(
                &mut state,
                LogLevel::Info,
                format!(
                    "Treatment cycle started at {} ({} stages, {} s)",
                    self.ctx.speed().current(),
                    self.plan.stages.len(),
                    self.plan.stages.total_seconds()
                ),
            );
            self.ctx.emit_frame(&state);
            run_id
        };

        let countdown_ctx = Arc::clone(&self.ctx);
        let budget = self.plan.stages.total_nominal();
        tokio::spawn(async move {
            if let Err(cancelled) = remaining::track_remaining(countdown_ctx, run_id, budget).await {
                debug!(%cancelled, "countdown stopped");
            }
        });

        let task = tokio::spawn(execute(Arc::clone(&self.ctx), Arc::clone(&self.plan), run_id));
        Some(RunHandle { run_id, task })
    }

    /// Cancel any run in progress and clear per-run state.
    ///
    /// Filter wear and cumulative stats are left untouched. Returns the
    /// newly current identity.
    pub async fn cancel(&self) -> RunId {
        let mut state = self.ctx.lock().await;
        let was_running = state.phase().is_running();
        let run_id = state.mint_run_id();
        state.recorder_mut().clear();
        *state.readings_mut() = self.plan.raw_readings();
        state.set_phase(RunPhase::Idle);
        let message = if was_running {
            "Cycle cancelled. System reset and ready for a new cycle"
        } else {
            "System reset and ready for a new cycle"
        };
        self.ctx.write_log(&mut state, LogLevel::Info, message);
        self.ctx.emit_frame(&state);
        run_id
    }

    /// Alias of [`RunController::cancel`], matching the reset button.
    pub async fn reset(&self) -> RunId {
        self.cancel().await
    }

    /// Advance to the next speed multiplier, wrapping to 1x.
    pub async fn cycle_speed(&self) -> SpeedMultiplier {
        let speed = self.ctx.speed().cycle();
        self.announce_speed(speed).await;
        speed
    }

    /// Set a specific speed multiplier. Returns the previous one.
    pub async fn set_speed(&self, speed: SpeedMultiplier) -> SpeedMultiplier {
        let previous = self.ctx.speed().set_speed(speed);
        self.announce_speed(speed).await;
        previous
    }

    /// Reset filter wear to zero. Valid in any phase.
    pub async fn regenerate_filter(&self) {
        let mut state = self.ctx.lock().await;
        let uses = state.filter().uses();
        state.filter_mut().regenerate();
        self.ctx.write_log(
            &mut state,
            LogLevel::Info,
            format!("Adsorption filter regenerated after {uses} uses"),
        );
        self.ctx.emit_frame(&state);
    }

    async fn announce_speed(&self, speed: SpeedMultiplier) {
        let mut state = self.ctx.lock().await;
        let active_nominal = state
            .readings()
            .stage
            .as_ref()
            .filter(|status| status.active)
            .and_then(|status| self.plan.stages.get(status.index))
            .map(Stage::nominal);
        if let (Some(nominal), Some(transition)) =
            (active_nominal, state.readings_mut().transition.as_mut())
        {
            // Rescale what is left of the transition, not the whole stage.
            let left = nominal.mul_f64((1.0 - transition.fraction).clamp(0.0, 1.0));
            transition.remaining_wall_ms = duration_ms(self.ctx.speed().to_simulated_duration(left));
        }
        self.ctx
            .write_log(&mut state, LogLevel::Info, format!("Speed set to {speed}"));
        self.ctx.emit_frame(&state);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Current frame.
    pub async fn snapshot(&self) -> EngineFrame {
        let state = self.ctx.lock().await;
        self.ctx.frame(&state)
    }

    /// Samples of the current run.
    pub async fn samples(&self) -> Vec<ConcentrationSample> {
        self.ctx.lock().await.recorder().to_vec()
    }

    /// Up to `limit` newest log entries.
    pub async fn log_entries(&self, limit: usize) -> Vec<LogEntry> {
        self.ctx.lock().await.log().latest(limit)
    }

    /// Identity that is current right now.
    pub async fn current_run(&self) -> RunId {
        self.ctx.lock().await.run_id()
    }

    /// Controller phase.
    pub async fn phase(&self) -> RunPhase {
        self.ctx.lock().await.phase()
    }
}

// ---------------------------------------------------------------------------
// Run task
// ---------------------------------------------------------------------------

async fn execute(ctx: Arc<SimulationContext>, plan: Arc<RunPlan>, run_id: RunId) -> RunOutcome {
    match drive(&ctx, &plan, run_id).await {
        Ok((verdict, final_ppm)) => RunOutcome::Completed { verdict, final_ppm },
        Err(cancelled) => {
            debug!(%cancelled, "run cancelled");
            RunOutcome::Cancelled
        }
    }
}

/// Values a stage animates from and to, fixed when the stage begins.
#[derive(Debug, Clone, Copy)]
enum StageAction {
    Hold,
    Ramp { from_ph: f64, to_ph: f64 },
    Decay { from_ppm: f64, to_ppm: f64 },
    Test,
}

async fn drive(
    ctx: &SimulationContext,
    plan: &RunPlan,
    run_id: RunId,
) -> Result<(Verdict, f64), Cancelled> {
    let total = plan.stages.total_nominal();
    let limit = plan.profile.water.approval_limit_ppm;
    let mut offset = Duration::ZERO;
    // Simulated time credited past the end of the previous stage.
    let mut carry = Duration::ZERO;

    for (index, stage) in plan.stages.iter().enumerate() {
        let action = enter_stage(ctx, index, stage, run_id).await?;
        let nominal = stage.nominal();

        let credited = wait::wait_from(ctx, nominal, carry, run_id, |state, tick| {
            apply_tick(ctx, state, stage, action, tick, offset, total, limit);
        })
        .await?;

        carry = credited.saturating_sub(nominal);
        offset = offset.saturating_add(nominal);
    }

    complete(ctx, plan, run_id).await
}

/// Enter a stage: check identity, mark it active, fix its action, log it.
async fn enter_stage(
    ctx: &SimulationContext,
    index: usize,
    stage: &Stage,
    run_id: RunId,
) -> Result<StageAction, Cancelled> {
    let mut state = ctx.lock().await;
    let current = state.run_id();
    if current != run_id {
        return Err(Cancelled {
            captured: run_id,
            current,
        });
    }

    state.set_phase(RunPhase::Running { stage_index: index });
    let wall_ms = duration_ms(ctx.speed().to_simulated_duration(stage.nominal()));
    let readings = state.readings_mut();
    readings.stage = Some(StageStatus {
        index,
        name: stage.name.clone(),
        active: true,
    });
    readings.transition = Some(TransitionProgress {
        fraction: 0.0,
        remaining_wall_ms: wall_ms,
    });
    let from_ph = readings.ph;
    let from_ppm = readings.concentration_ppm;

    let (action, message) = match stage.kind {
        StageKind::PipeTransfer => (StageAction::Hold, format!("{}: transferring water", stage.name)),
        StageKind::DoseAndRamp { to_ph } => (
            StageAction::Ramp { from_ph, to_ph },
            format!("{}: dosing, pH {from_ph:.1} -> {to_ph:.1}", stage.name),
        ),
        StageKind::ReactionDecay {
            to_ppm,
            filter_bound,
        } => {
            let target = if filter_bound {
                let filter = state.filter();
                if filter.is_degraded() {
                    let uses = filter.uses();
                    let degraded = filter.target_ppm();
                    ctx.write_log(
                        &mut state,
                        LogLevel::Warning,
                        format!(
                            "Adsorption filter worn ({uses} uses since regeneration): \
                             target degraded to {degraded:.2} ppm. Regenerate the filter"
                        ),
                    );
                }
                state.filter().target_ppm()
            } else {
                to_ppm
            };
            (
                StageAction::Decay {
                    from_ppm,
                    to_ppm: target,
                },
                format!("{}: reacting, {from_ppm:.1} -> {target:.2} ppm", stage.name),
            )
        }
        StageKind::Finalize => (StageAction::Test, format!("{}: running quality test", stage.name)),
    };

    ctx.write_log(&mut state, LogLevel::Info, message);
    ctx.emit_frame(&state);
    Ok(action)
}

/// Apply one poll of a stage to the locked state.
#[allow(clippy::too_many_arguments)]
fn apply_tick(
    ctx: &SimulationContext,
    state: &mut RunState,
    stage: &Stage,
    action: StageAction,
    tick: WaitTick,
    offset: Duration,
    total: Duration,
    limit: f64,
) {
    let run_elapsed = offset.saturating_add(tick.elapsed);
    let wall_ms = duration_ms(ctx.speed().to_simulated_duration(tick.remaining()));

    let readings = state.readings_mut();
    match action {
        StageAction::Hold => {}
        StageAction::Ramp { from_ph, to_ph } => {
            readings.ph = curve::linear_ramp(from_ph, to_ph, tick.nominal, tick.elapsed);
        }
        StageAction::Decay { from_ppm, to_ppm } => {
            readings.concentration_ppm = curve::decay(from_ppm, to_ppm, tick.nominal, tick.elapsed);
        }
        StageAction::Test => {
            if tick.is_final() {
                readings.verdict = Some(verdict_for(readings.concentration_ppm, limit));
            }
        }
    }
    readings.transition = Some(TransitionProgress {
        fraction: tick.fraction(),
        remaining_wall_ms: wall_ms,
    });
    readings.progress = curve::progress_fraction(total, run_elapsed);
    if tick.is_final() {
        if let Some(status) = readings.stage.as_mut() {
            status.active = false;
        }
    }
    let ppm = readings.concentration_ppm;

    state
        .recorder_mut()
        .record(run_elapsed.as_secs_f64(), ppm);
    ctx.emit_sample(state);

    if tick.is_final() && matches!(action, StageAction::Decay { .. }) {
        ctx.write_log(
            state,
            LogLevel::Info,
            format!("{} complete: {ppm:.2} ppm", stage.name),
        );
    }
    ctx.emit_frame(state);
}

/// The single completion transition: wear, totals, verdict, phase.
async fn complete(
    ctx: &SimulationContext,
    plan: &RunPlan,
    run_id: RunId,
) -> Result<(Verdict, f64), Cancelled> {
    let mut state = ctx.lock().await;
    let current = state.run_id();
    if current != run_id {
        return Err(Cancelled {
            captured: run_id,
            current,
        });
    }

    let limit = plan.profile.water.approval_limit_ppm;
    let final_ppm = state.readings().concentration_ppm;
    let verdict = state
        .readings()
        .verdict
        .unwrap_or_else(|| verdict_for(final_ppm, limit));

    state.filter_mut().record_use();
    state
        .stats_mut()
        .record_batch(plan.profile.batch_volume_liters, plan.profile.batch_cost);

    let readings = state.readings_mut();
    readings.verdict = Some(verdict);
    readings.remaining_seconds = 0;
    readings.progress = 1.0;
    readings.transition = None;
    state.set_phase(RunPhase::Completed);

    let (level, message) = match verdict {
        Verdict::Approved => (
            LogLevel::Success,
            format!("Result: water approved at {final_ppm:.2} ppm (limit {limit:.2})"),
        ),
        Verdict::Rejected => (
            LogLevel::Warning,
            format!("Result: water rejected at {final_ppm:.2} ppm (limit {limit:.2})"),
        ),
    };
    ctx.write_log(&mut state, level, message);
    info!(
        %run_id,
        ?verdict,
        final_ppm,
        filter_uses = state.filter().uses(),
        completed_runs = state.stats().completed_runs,
        "run completed"
    );
    ctx.emit_frame(&state);

    Ok((verdict, final_ppm))
}

fn verdict_for(ppm: f64, limit: f64) -> Verdict {
    if ppm < limit {
        Verdict::Approved
    } else {
        Verdict::Rejected
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
