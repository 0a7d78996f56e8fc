//! Observer API server for the Aquaflow treatment engine.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/frames`) streaming every frame, sample
//!   and log entry the engine publishes, via [`tokio::sync::broadcast`]
//! - **REST endpoints** for reading the current frame, the sample series of
//!   the current run, and the operator log
//! - **Command endpoints** for start, reset, speed and filter regeneration
//!
//! # Architecture
//!
//! The engine publishes through a [`BroadcastSink`], which the
//! [`RunController`] calls from inside its identity-checked critical
//! section. REST reads go straight to the controller. The only logic this
//! crate adds is presentation: formatted values and the pH jitter of
//! [`display`], which never feeds back into the engine.
//!
//! [`BroadcastSink`]: sink::BroadcastSink
//! [`RunController`]: aquaflow_core::controller::RunController

pub mod commands;
pub mod display;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod sink;
pub mod startup;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, StreamMessage};
