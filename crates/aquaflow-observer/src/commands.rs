//! Command endpoints that drive the run controller.
//!
//! Commands never fail because of the engine's phase: a start while a run
//! is in progress, or a reset while idle, is answered with `ok: false` or a
//! plain acknowledgement. Only malformed input is an error.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/commands/start` | Start a run |
//! | `POST` | `/api/commands/reset` | Cancel any run and reset |
//! | `POST` | `/api/commands/speed` | Cycle speed, or set `{ "multiplier": n }` |
//! | `POST` | `/api/commands/regenerate-filter` | Reset filter wear |

use std::sync::Arc;

use aquaflow_types::{RunId, SpeedMultiplier};
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;

use crate::error::ObserverError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /api/commands/speed`.
#[derive(Debug, serde::Deserialize)]
pub struct SetSpeedRequest {
    /// Multiplier to set: 1, 10, 100 or 1000.
    pub multiplier: u32,
}

/// Generic command response.
#[derive(Debug, serde::Serialize)]
struct CommandResponse {
    /// Whether the command took effect.
    ok: bool,
    /// Human-readable message.
    message: String,
    /// Identity current after the command.
    run_id: RunId,
}

// ---------------------------------------------------------------------------
// POST /api/commands/start
// ---------------------------------------------------------------------------

/// Start a run. A no-op while one is already running.
pub async fn start(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.controller.start().await {
        Some(handle) => {
            info!(run_id = %handle.run_id, "run started by operator");
            Json(CommandResponse {
                ok: true,
                message: "Treatment cycle started".to_owned(),
                run_id: handle.run_id,
            })
        }
        None => Json(CommandResponse {
            ok: false,
            message: "A treatment cycle is already running".to_owned(),
            run_id: state.controller.current_run().await,
        }),
    }
}

// ---------------------------------------------------------------------------
// POST /api/commands/reset
// ---------------------------------------------------------------------------

/// Cancel any run in progress and return to idle.
pub async fn reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let run_id = state.controller.reset().await;
    Json(CommandResponse {
        ok: true,
        message: "System reset".to_owned(),
        run_id,
    })
}

// ---------------------------------------------------------------------------
// POST /api/commands/speed
// ---------------------------------------------------------------------------

/// Cycle to the next speed multiplier, or set one given in the body.
///
/// An empty body cycles. A body must be `{ "multiplier": n }` with `n` one
/// of 1, 10, 100 or 1000.
pub async fn speed(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ObserverError> {
    let (previous, speed) = if body.iter().all(u8::is_ascii_whitespace) {
        let previous = state.controller.context().speed().current();
        (previous, state.controller.cycle_speed().await)
    } else {
        let request: SetSpeedRequest = serde_json::from_slice(&body)?;
        let speed = SpeedMultiplier::try_from(request.multiplier)?;
        (state.controller.set_speed(speed).await, speed)
    };

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": format!("Speed changed from {previous} to {speed}"),
        "previous": previous,
        "speed": speed,
    })))
}

// ---------------------------------------------------------------------------
// POST /api/commands/regenerate-filter
// ---------------------------------------------------------------------------

/// Reset adsorption filter wear. Valid in any phase.
pub async fn regenerate_filter(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.controller.regenerate_filter().await;
    Json(CommandResponse {
        ok: true,
        message: "Adsorption filter regenerated".to_owned(),
        run_id: state.controller.current_run().await,
    })
}
