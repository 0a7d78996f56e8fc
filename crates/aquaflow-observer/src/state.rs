//! Shared application state for the Observer API server.
//!
//! [`AppState`] holds the [`RunController`] that commands are forwarded to
//! and the broadcast channel that the engine's [`BroadcastSink`] publishes
//! into. `WebSocket` clients subscribe to that channel.
//!
//! [`BroadcastSink`]: crate::sink::BroadcastSink

use std::sync::Arc;

use aquaflow_core::config::{AquaflowConfig, ConfigError};
use aquaflow_core::controller::RunController;
use aquaflow_types::{ConcentrationSample, EngineFrame, LogEntry, RunId};
use tokio::sync::broadcast;

use crate::sink::BroadcastSink;

/// Capacity of the broadcast channel for stream messages.
///
/// If a subscriber falls behind by more than this many messages it will
/// receive a [`broadcast::error::RecvError::Lagged`] and skip to the
/// newest message.
pub const BROADCAST_CAPACITY: usize = 256;

/// JSON message pushed over the `WebSocket`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// A full frame, sent after every poll and transition.
    Frame(EngineFrame),
    /// A sample appended to the current run's series.
    Sample {
        /// Run the sample belongs to.
        run_id: RunId,
        /// The sample.
        sample: ConcentrationSample,
    },
    /// A new operator log entry.
    Log(LogEntry),
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The engine's run controller.
    pub controller: RunController,
    /// Broadcast sender for stream messages.
    pub tx: broadcast::Sender<StreamMessage>,
}

impl AppState {
    /// Build the controller from configuration, wired to a fresh broadcast
    /// channel.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration does not validate.
    pub fn from_config(config: &AquaflowConfig) -> Result<Self, ConfigError> {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        let sink = Arc::new(BroadcastSink::new(tx.clone()));
        let controller = RunController::from_config(config, sink)?;
        Ok(Self { controller, tx })
    }

    /// Subscribe to the stream.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamMessage> {
        self.tx.subscribe()
    }
}
