//! Staged simulation engine for the Aquaflow water-treatment demo.
//!
//! This crate advances a multi-stage treatment process over compressed
//! wall-clock time. Runs can be sped up live, cancelled and restarted
//! mid-flight, and produce a concentration time series for the display
//! layer.
//!
//! # Modules
//!
//! - [`clock`] -- [`SpeedController`] holding the live time-compression factor.
//! - [`config`] -- Configuration loading from `aquaflow-config.yaml`.
//! - [`context`] -- [`SimulationContext`], the single owner of mutable state.
//! - [`controller`] -- [`RunController`], the run state machine.
//! - [`curve`] -- Pure pH ramp and concentration decay curves.
//! - [`event_log`] -- Newest-first operator log.
//! - [`filter`] -- Cross-run adsorption filter wear.
//! - [`recorder`] -- Run-scoped concentration samples.
//! - [`remaining`] -- Time-remaining countdown task.
//! - [`sink`] -- [`FrameSink`] trait through which the display layer is fed.
//! - [`stage`] -- Stage definitions and the ordered [`StageSequencer`].
//! - [`wait`] -- The identity-checked, speed-scaled wait primitive.
//!
//! [`SpeedController`]: clock::SpeedController
//! [`SimulationContext`]: context::SimulationContext
//! [`RunController`]: controller::RunController
//! [`FrameSink`]: sink::FrameSink
//! [`StageSequencer`]: stage::StageSequencer

pub mod clock;
pub mod config;
pub mod context;
pub mod controller;
pub mod curve;
pub mod event_log;
pub mod filter;
pub mod recorder;
pub mod remaining;
pub mod sink;
pub mod stage;
pub mod wait;
