//! Output seam between the engine and the display layer.
//!
//! The engine calls a [`FrameSink`] from inside the same critical section
//! that checked the run identity, so a superseded run can never emit.

use aquaflow_types::{ConcentrationSample, EngineFrame, LogEntry, RunId};

/// Receiver of everything the engine publishes.
///
/// Implementations must not block: they are called while the engine holds
/// its state lock.
pub trait FrameSink: Send + Sync {
    /// Called after every poll and every transition.
    fn on_frame(&self, frame: &EngineFrame);

    /// Called for every sample appended to the recorder.
    fn on_sample(&self, run_id: RunId, sample: &ConcentrationSample);

    /// Called for every operator log entry.
    fn on_log(&self, entry: &LogEntry);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpSink;

impl FrameSink for NoOpSink {
    fn on_frame(&self, _frame: &EngineFrame) {}

    fn on_sample(&self, _run_id: RunId, _sample: &ConcentrationSample) {}

    fn on_log(&self, _entry: &LogEntry) {}
}
