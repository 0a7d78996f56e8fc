//! Engine binary for the Aquaflow water-treatment demo.
//!
//! This is the main entry point that wires together configuration, the
//! run controller and the observer server. Runs are started and cancelled
//! by the operator through the observer API; the binary itself only keeps
//! the process alive until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `aquaflow-config.yaml` (or `AQUAFLOW_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the run controller wired to the observer broadcast channel
//! 4. Spawn the observer HTTP + `WebSocket` server
//! 5. Wait for `Ctrl-C`, cancel any run in progress, log the totals

mod error;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use aquaflow_core::config::AquaflowConfig;
use aquaflow_observer::server::ServerConfig;
use aquaflow_observer::startup::spawn_observer;
use aquaflow_observer::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Config file used when `AQUAFLOW_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "aquaflow-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration is invalid or the observer cannot
/// start.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration. Tracing is not up yet, so report the source
    //    once it is.
    let config_path = config_path();
    let (config, from_file) = load_config(&config_path)?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .init();

    info!("aquaflow-engine starting");
    if from_file {
        info!(path = %config_path.display(), "Configuration loaded");
    } else {
        info!(path = %config_path.display(), "Config file not found, using defaults");
    }
    info!(
        stages = config.stages.len(),
        poll_interval_ms = config.engine.poll_interval_ms,
        initial_speed = %config.engine.initial_speed,
        approval_limit_ppm = config.water.approval_limit_ppm,
        "Treatment plan ready"
    );

    // 3. Build the controller and its broadcast channel.
    let state = Arc::new(AppState::from_config(&config)?);

    // 4. Spawn the observer.
    let observer = spawn_observer(ServerConfig::from(&config.observer), Arc::clone(&state))
        .map_err(EngineError::from)?;

    // 5. Run until interrupted.
    tokio::signal::ctrl_c().await.map_err(EngineError::from)?;
    info!("Shutdown signal received");

    let controller = &state.controller;
    if controller.phase().await.is_running() {
        controller.cancel().await;
    }
    observer.abort();

    let frame = controller.snapshot().await;
    info!(
        completed_runs = frame.stats.completed_runs,
        total_volume_liters = frame.stats.total_volume_liters,
        total_cost = %frame.stats.total_cost,
        filter_uses = frame.filter.uses_since_regeneration,
        "aquaflow-engine shutdown complete"
    );

    Ok(())
}

/// Path of the configuration file.
fn config_path() -> PathBuf {
    std::env::var_os("AQUAFLOW_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from)
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist. The flag reports whether the file was read.
fn load_config(path: &Path) -> Result<(AquaflowConfig, bool), EngineError> {
    if path.exists() {
        Ok((AquaflowConfig::from_file(path)?, true))
    } else {
        // Still goes through env overrides and validation.
        Ok((AquaflowConfig::parse("")?, false))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let (config, from_file) =
            load_config(Path::new("definitely/not/here/aquaflow-config.yaml")).unwrap();
        assert!(!from_file);
        assert_eq!(config.stages.len(), 6);
    }

    #[test]
    fn shipped_config_file_parses() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../aquaflow-config.yaml");
        let (config, from_file) = load_config(&path).unwrap();
        assert!(from_file);
        assert_eq!(config.stages.len(), 6);
        assert_eq!(config.filter.degrade_after_uses, 3);
    }
}
