//! [`FrameSink`] implementation that fans engine output out to `WebSocket`
//! clients.

use aquaflow_core::sink::FrameSink;
use aquaflow_types::{ConcentrationSample, EngineFrame, LogEntry, RunId};
use tokio::sync::broadcast;

use crate::state::StreamMessage;

/// Publishes every frame, sample and log entry on a broadcast channel.
///
/// Sending never blocks, so it is safe to call under the engine lock.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<StreamMessage>,
}

impl BroadcastSink {
    /// Wrap a broadcast sender.
    pub const fn new(tx: broadcast::Sender<StreamMessage>) -> Self {
        Self { tx }
    }

    fn publish(&self, message: StreamMessage) {
        // Err only means nobody is subscribed right now.
        let _ = self.tx.send(message);
    }
}

impl FrameSink for BroadcastSink {
    fn on_frame(&self, frame: &EngineFrame) {
        self.publish(StreamMessage::Frame(frame.clone()));
    }

    fn on_sample(&self, run_id: RunId, sample: &ConcentrationSample) {
        self.publish(StreamMessage::Sample {
            run_id,
            sample: *sample,
        });
    }

    fn on_log(&self, entry: &LogEntry) {
        self.publish(StreamMessage::Log(entry.clone()));
    }
}
