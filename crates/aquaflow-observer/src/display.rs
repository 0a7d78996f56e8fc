//! Presentation-only view of a frame.
//!
//! The engine exposes the authoritative pH. Real probes flicker, so the
//! display view adds a small random offset before showing it. Nothing here
//! is ever written back into the engine.

use aquaflow_types::{EngineFrame, RunPhase, Verdict};
use rand::Rng;

/// Largest pH offset added for display.
pub const PH_JITTER: f64 = 0.05;

/// Color hint for the treated-water readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    /// Below the approval limit.
    Low,
    /// At or above the approval limit.
    High,
    /// No result yet.
    Neutral,
}

/// Display-ready values derived from one [`EngineFrame`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DisplayView {
    /// Status line.
    pub status: String,
    /// pH with display jitter, one decimal.
    pub ph: String,
    /// Live concentration, one decimal.
    pub concentration: String,
    /// Treated-water concentration, two decimals, or `--` before the test.
    pub output: String,
    /// Color hint for `output`.
    pub output_tone: Tone,
    /// Speed label such as `10x`.
    pub speed: String,
}

/// Add display jitter to an authoritative pH value.
pub fn jittered_ph<R: Rng + ?Sized>(ph: f64, rng: &mut R) -> f64 {
    ph + rng.random_range(-PH_JITTER..=PH_JITTER)
}

/// Build the display view of `frame`.
pub fn build_view<R: Rng + ?Sized>(frame: &EngineFrame, rng: &mut R) -> DisplayView {
    let readings = &frame.readings;
    let (output, output_tone) = match readings.verdict {
        Some(Verdict::Approved) => (format!("{:.2}", readings.concentration_ppm), Tone::Low),
        Some(Verdict::Rejected) => (format!("{:.2}", readings.concentration_ppm), Tone::High),
        None => ("--".to_owned(), Tone::Neutral),
    };

    DisplayView {
        status: status_line(frame),
        ph: format!("{:.1}", jittered_ph(readings.ph, rng)),
        concentration: format!("{:.1}", readings.concentration_ppm),
        output,
        output_tone,
        speed: frame.speed.to_string(),
    }
}

fn status_line(frame: &EngineFrame) -> String {
    match (frame.phase, &frame.readings.stage, frame.readings.verdict) {
        (RunPhase::Idle, _, _) => "Waiting to start".to_owned(),
        (RunPhase::Running { .. }, Some(stage), _) => {
            format!("Running: {} ({}s left)", stage.name, frame.readings.remaining_seconds)
        }
        (RunPhase::Running { .. }, None, _) => "Running".to_owned(),
        (RunPhase::Completed, _, Some(Verdict::Approved)) => "Completed: approved".to_owned(),
        (RunPhase::Completed, _, Some(Verdict::Rejected)) => "Completed: rejected".to_owned(),
        (RunPhase::Completed, _, None) => "Completed".to_owned(),
    }
}
