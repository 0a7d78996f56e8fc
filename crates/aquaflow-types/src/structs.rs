//! Core value structs shared between the engine and the display layer.
//!
//! Covers the concentration time series, live readings, cross-run filter
//! and batch statistics, operator log entries, and the [`EngineFrame`]
//! emitted on every poll and transition.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{LogLevel, RunPhase, SpeedMultiplier, Verdict};
use crate::ids::RunId;

/// One point of the concentration chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ConcentrationSample {
    /// Simulated seconds elapsed since the run started.
    pub seconds: f64,
    /// Contaminant concentration in ppm.
    pub ppm: f64,
}

/// Cross-run wear of the adsorption filter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct FilterWearState {
    /// Completed runs since the filter was last regenerated.
    pub uses_since_regeneration: u32,
    /// Whether the adsorption stage currently reaches only the degraded target.
    pub degraded: bool,
}

/// Totals accumulated over every completed run of the process.
///
/// Never decremented; a reset clears per-run state only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CumulativeStats {
    /// Liters of water treated.
    pub total_volume_liters: u64,
    /// Treatment cost, serialized as a decimal string.
    #[ts(as = "String")]
    pub total_cost: Decimal,
    /// Number of runs that went through every stage.
    pub completed_runs: u64,
}

impl CumulativeStats {
    /// Add one treated batch to the totals.
    pub fn record_batch(&mut self, volume_liters: u64, cost: Decimal) {
        self.total_volume_liters = self.total_volume_liters.saturating_add(volume_liters);
        self.total_cost = self.total_cost.saturating_add(cost);
        self.completed_runs = self.completed_runs.saturating_add(1);
    }
}

/// Timestamped operator message. The log is kept newest-first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LogEntry {
    /// When the message was written.
    pub at: DateTime<Utc>,
    /// Severity.
    pub level: LogLevel,
    /// Free-text message.
    pub message: String,
}

/// Status of the stage the run is in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StageStatus {
    /// Zero-based position in the stage plan.
    pub index: usize,
    /// Stage name as configured.
    pub name: String,
    /// `false` once the stage's wait has resolved.
    pub active: bool,
}

/// Progress of the visual transition tied to the active stage.
///
/// `remaining_wall_ms` is recomputed from the current progress and the live
/// speed on every poll, so a speed change shortens the pending transition
/// instead of restarting it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct TransitionProgress {
    /// Fraction of the stage completed, in `[0, 1]`.
    pub fraction: f64,
    /// Wall-clock milliseconds left at the current speed.
    pub remaining_wall_ms: u64,
}

/// Live values the display layer renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Readings {
    /// Current contaminant concentration in ppm.
    pub concentration_ppm: f64,
    /// Current pH, without any display jitter.
    pub ph: f64,
    /// Stage the run is in, if any.
    pub stage: Option<StageStatus>,
    /// Transition of the active stage, if any.
    pub transition: Option<TransitionProgress>,
    /// Simulated seconds left in the run.
    pub remaining_seconds: u64,
    /// Fraction of the total simulated-time budget consumed, in `[0, 1]`.
    pub progress: f64,
    /// Result of the quality test once the final stage has run.
    pub verdict: Option<Verdict>,
}

impl Readings {
    /// Readings for untreated water before a run.
    pub const fn raw(concentration_ppm: f64, ph: f64, remaining_seconds: u64) -> Self {
        Self {
            concentration_ppm,
            ph,
            stage: None,
            transition: None,
            remaining_seconds,
            progress: 0.0,
            verdict: None,
        }
    }
}

/// Everything the display layer needs for one redraw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EngineFrame {
    /// Identity current when the frame was produced.
    pub run_id: RunId,
    /// Controller phase.
    pub phase: RunPhase,
    /// Speed multiplier in effect.
    #[ts(as = "u32")]
    pub speed: SpeedMultiplier,
    /// Live readings.
    pub readings: Readings,
    /// Filter wear.
    pub filter: FilterWearState,
    /// Cumulative totals.
    pub stats: CumulativeStats,
}
