//! Stage definitions and the ordered stage plan.
//!
//! A run walks the [`StageSequencer`] front to back. Each [`Stage`] has a
//! nominal duration (its length at 1x speed) and a [`StageKind`] that
//! decides what the stage animates while its wait is pending.

use std::time::Duration;

use serde::Deserialize;

/// Errors raised when building a stage plan.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The plan contains no stages.
    #[error("stage plan is empty")]
    Empty,

    /// A stage has a zero nominal duration.
    #[error("stage {name} has a zero duration")]
    ZeroDuration {
        /// Name of the offending stage.
        name: String,
    },

    /// Two stages share a name.
    #[error("duplicate stage name: {name}")]
    DuplicateName {
        /// The repeated name.
        name: String,
    },
}

/// What a stage does while it runs.
///
/// Ramps and decays start from whatever value the previous stage left
/// behind, so the plan only names targets.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageKind {
    /// Water moves between tanks; values hold steady.
    PipeTransfer,
    /// A reagent is dosed and pH ramps linearly to `to_ph`.
    DoseAndRamp {
        /// pH reached at the end of the stage.
        to_ph: f64,
    },
    /// Concentration decays non-linearly toward `to_ppm`.
    ReactionDecay {
        /// Target concentration in ppm.
        to_ppm: f64,
        /// When set, this is the adsorption stage: the target comes from
        /// the filter wear model and `to_ppm` only documents the fresh value.
        #[serde(default)]
        filter_bound: bool,
    },
    /// Quality test; the verdict is decided when the wait resolves.
    Finalize,
}

/// One immutable step of the treatment process.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Stage {
    /// Stage name shown to the operator.
    pub name: String,
    /// Duration at 1x speed, in milliseconds.
    pub nominal_ms: u64,
    /// Action performed during the stage.
    #[serde(flatten)]
    pub kind: StageKind,
}

impl Stage {
    /// Build a stage.
    pub fn new(name: impl Into<String>, nominal_ms: u64, kind: StageKind) -> Self {
        Self {
            name: name.into(),
            nominal_ms,
            kind,
        }
    }

    /// Nominal duration as a [`Duration`].
    pub const fn nominal(&self) -> Duration {
        Duration::from_millis(self.nominal_ms)
    }
}

/// Ordered, validated list of stages shared by every run.
#[derive(Debug, Clone, PartialEq)]
pub struct StageSequencer {
    stages: Vec<Stage>,
    total: Duration,
}

impl StageSequencer {
    /// Validate and freeze a stage plan.
    ///
    /// # Errors
    ///
    /// Returns [`StageError`] if the plan is empty, a stage has a zero
    /// duration, or two stages share a name.
    pub fn new(stages: Vec<Stage>) -> Result<Self, StageError> {
        if stages.is_empty() {
            return Err(StageError::Empty);
        }

        let mut total = Duration::ZERO;
        for (index, stage) in stages.iter().enumerate() {
            if stage.nominal_ms == 0 {
                return Err(StageError::ZeroDuration {
                    name: stage.name.clone(),
                });
            }
            let earlier = stages.get(..index).unwrap_or_default();
            if earlier.iter().any(|s| s.name == stage.name) {
                return Err(StageError::DuplicateName {
                    name: stage.name.clone(),
                });
            }
            total = total.saturating_add(stage.nominal());
        }

        Ok(Self { stages, total })
    }

    /// Iterate stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    /// Stage at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&Stage> {
        self.stages.get(index)
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always `false` for a validated plan.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Simulated-time budget of a whole run. Speed changes never alter it.
    pub const fn total_nominal(&self) -> Duration {
        self.total
    }

    /// Budget in whole seconds, rounded up, for the countdown display.
    pub fn total_seconds(&self) -> u64 {
        u64::try_from(self.total.as_millis().div_ceil(1000)).unwrap_or(u64::MAX)
    }
}

/// The fluoride-removal plan of the demo: lime precipitation, pH
/// correction, alumina adsorption, and a colorimetric quality test.
pub fn default_stages() -> Vec<Stage> {
    vec![
        Stage::new("intake", 1500, StageKind::PipeTransfer),
        Stage::new("lime_dosing", 1000, StageKind::DoseAndRamp { to_ph: 11.5 }),
        Stage::new(
            "precipitation",
            2000,
            StageKind::ReactionDecay {
                to_ppm: 10.0,
                filter_bound: false,
            },
        ),
        Stage::new("ph_correction", 1000, StageKind::DoseAndRamp { to_ph: 6.0 }),
        Stage::new(
            "adsorption",
            2500,
            StageKind::ReactionDecay {
                to_ppm: 0.82,
                filter_bound: true,
            },
        ),
        Stage::new("quality_test", 2000, StageKind::Finalize),
    ]
}
