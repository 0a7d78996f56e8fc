//! The simulation context: one explicit owner for all mutable state.
//!
//! Speed lives in a lock-free [`SpeedController`] because every poll reads
//! it. Everything else sits in a single [`RunState`] behind one async mutex,
//! so the identity check and the effect it guards always happen in the same
//! critical section: a reset that bumps the [`RunId`] can never interleave
//! between a stale task's check and its write.

use std::sync::Arc;
use std::time::Duration;

use aquaflow_types::{
    CumulativeStats, EngineFrame, LogEntry, LogLevel, Readings, RunId, RunPhase,
};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};

use crate::clock::SpeedController;
use crate::event_log::EventLog;
use crate::filter::FilterWearModel;
use crate::recorder::SampleRecorder;
use crate::sink::FrameSink;

/// Mutable state guarded by the context lock.
#[derive(Debug)]
pub struct RunState {
    run_id: RunId,
    phase: RunPhase,
    readings: Readings,
    recorder: SampleRecorder,
    filter: FilterWearModel,
    stats: CumulativeStats,
    log: EventLog,
}

impl RunState {
    /// Initial state: idle, no samples, fresh filter, zero totals.
    pub const fn new(readings: Readings, filter: FilterWearModel) -> Self {
        Self {
            run_id: RunId::INITIAL,
            phase: RunPhase::Idle,
            readings,
            recorder: SampleRecorder::new(),
            filter,
            stats: CumulativeStats {
                total_volume_liters: 0,
                total_cost: rust_decimal::Decimal::ZERO,
                completed_runs: 0,
            },
            log: EventLog::new(),
        }
    }

    /// Identity that is current right now.
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Mint a fresh identity, invalidating all in-flight work.
    pub(crate) const fn mint_run_id(&mut self) -> RunId {
        self.run_id = self.run_id.next();
        self.run_id
    }

    /// Controller phase.
    pub const fn phase(&self) -> RunPhase {
        self.phase
    }

    pub(crate) const fn set_phase(&mut self, phase: RunPhase) {
        self.phase = phase;
    }

    /// Live readings.
    pub const fn readings(&self) -> &Readings {
        &self.readings
    }

    pub(crate) const fn readings_mut(&mut self) -> &mut Readings {
        &mut self.readings
    }

    /// Samples of the current run.
    pub const fn recorder(&self) -> &SampleRecorder {
        &self.recorder
    }

    pub(crate) const fn recorder_mut(&mut self) -> &mut SampleRecorder {
        &mut self.recorder
    }

    /// Filter wear.
    pub const fn filter(&self) -> &FilterWearModel {
        &self.filter
    }

    pub(crate) const fn filter_mut(&mut self) -> &mut FilterWearModel {
        &mut self.filter
    }

    /// Cumulative totals.
    pub const fn stats(&self) -> &CumulativeStats {
        &self.stats
    }

    pub(crate) const fn stats_mut(&mut self) -> &mut CumulativeStats {
        &mut self.stats
    }

    /// Operator log.
    pub const fn log(&self) -> &EventLog {
        &self.log
    }
}

/// Process-lifetime simulation context shared by the controller and every
/// task it spawns.
pub struct SimulationContext {
    speed: SpeedController,
    poll_interval: Duration,
    state: Mutex<RunState>,
    sink: Arc<dyn FrameSink>,
}

impl core::fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SimulationContext")
            .field("speed", &self.speed)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    /// Assemble a context.
    pub fn new(
        speed: SpeedController,
        poll_interval: Duration,
        state: RunState,
        sink: Arc<dyn FrameSink>,
    ) -> Self {
        Self {
            speed,
            poll_interval,
            state: Mutex::new(state),
            sink,
        }
    }

    /// The live speed controller.
    pub const fn speed(&self) -> &SpeedController {
        &self.speed
    }

    /// Real-time granularity of wait polls.
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Acquire the state lock.
    pub async fn lock(&self) -> MutexGuard<'_, RunState> {
        self.state.lock().await
    }

    /// Build a frame from the locked state.
    pub fn frame(&self, state: &RunState) -> EngineFrame {
        EngineFrame {
            run_id: state.run_id,
            phase: state.phase,
            speed: self.speed.current(),
            readings: state.readings.clone(),
            filter: state.filter.state(),
            stats: state.stats.clone(),
        }
    }

    /// Publish a frame built from the locked state.
    pub fn emit_frame(&self, state: &RunState) {
        self.sink.on_frame(&self.frame(state));
    }

    /// Append the newest sample of the locked state to the sink.
    pub(crate) fn emit_sample(&self, state: &RunState) {
        if let Some(sample) = state.recorder.last() {
            self.sink.on_sample(state.run_id, sample);
        }
    }

    /// Write an operator log entry, mirror it to tracing, and publish it.
    pub fn write_log(&self, state: &mut RunState, level: LogLevel, message: impl Into<String>) {
        let entry: LogEntry = state.log.push(level, message);
        match level {
            LogLevel::Warning => warn!(run_id = %state.run_id, "{}", entry.message),
            LogLevel::Info | LogLevel::Success => {
                info!(run_id = %state.run_id, "{}", entry.message);
            }
        }
        self.sink.on_log(&entry);
    }
}
