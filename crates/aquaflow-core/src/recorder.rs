//! Run-scoped concentration samples for the chart.

use aquaflow_types::ConcentrationSample;

/// Ordered, append-only series of samples for the current run.
///
/// Cleared when a run starts and on reset; otherwise only grows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SampleRecorder {
    samples: Vec<ConcentrationSample>,
}

impl SampleRecorder {
    /// Create an empty recorder.
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append a sample and return it.
    pub fn record(&mut self, seconds: f64, ppm: f64) -> ConcentrationSample {
        let sample = ConcentrationSample { seconds, ppm };
        self.samples.push(sample);
        sample
    }

    /// Drop every sample.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Lazily iterate samples in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &ConcentrationSample> {
        self.samples.iter()
    }

    /// Most recent sample.
    pub fn last(&self) -> Option<&ConcentrationSample> {
        self.samples.last()
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no sample has been recorded.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Owned copy of the series.
    pub fn to_vec(&self) -> Vec<ConcentrationSample> {
        self.samples.clone()
    }
}
