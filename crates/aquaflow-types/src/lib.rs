//! Shared type definitions for the Aquaflow treatment simulation.
//!
//! This crate is the single source of truth for every value that crosses
//! the boundary between the engine and the display layer. Types flow
//! downstream to `TypeScript` via `ts-rs` for the demo front end.
//!
//! # Modules
//!
//! - [`ids`] -- The [`RunId`] cancellation token minted per run
//! - [`enums`] -- Speed multipliers, run phases, log levels, verdicts
//! - [`structs`] -- Samples, readings, filter and batch statistics, frames

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{InvalidSpeed, LogLevel, RunPhase, SpeedMultiplier, Verdict};
pub use ids::RunId;
pub use structs::{
    ConcentrationSample, CumulativeStats, EngineFrame, FilterWearState, LogEntry, Readings,
    StageStatus, TransitionProgress,
};
