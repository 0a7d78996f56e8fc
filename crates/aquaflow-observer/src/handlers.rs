//! REST read endpoints for the Observer server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/status` | Current frame plus its display view |
//! | `GET` | `/api/samples` | Samples of the current run |
//! | `GET` | `/api/log` | Operator log, newest first |

use std::sync::Arc;

use aquaflow_core::event_log::MAX_LOG_ENTRIES;
use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;

use crate::display::{self, DisplayView};
use crate::error::ObserverError;
use crate::state::AppState;

/// Log entries returned when no `limit` is given.
const DEFAULT_LOG_LIMIT: usize = 50;

// ---------------------------------------------------------------------------
// Query parameter structs
// ---------------------------------------------------------------------------

/// Query parameters for the `GET /api/log` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct LogQuery {
    /// Maximum number of entries to return (default 50).
    pub limit: Option<usize>,
}

/// Response body of `GET /api/status`.
#[derive(Debug, serde::Serialize)]
pub struct StatusResponse {
    /// Authoritative engine frame.
    pub frame: aquaflow_types::EngineFrame,
    /// Display-ready values, including jittered pH.
    pub display: DisplayView,
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return the current frame and its display view.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let frame = state.controller.snapshot().await;
    let display = display::build_view(&frame, &mut rand::rng());
    Json(StatusResponse { frame, display })
}

// ---------------------------------------------------------------------------
// GET /api/samples
// ---------------------------------------------------------------------------

/// Return the concentration series of the current run.
pub async fn samples(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let run_id = state.controller.current_run().await;
    let samples = state.controller.samples().await;
    Json(serde_json::json!({
        "run_id": run_id,
        "count": samples.len(),
        "samples": samples,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/log
// ---------------------------------------------------------------------------

/// Return the newest log entries.
///
/// `limit` must be between 1 and the log capacity.
pub async fn log(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LogQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let limit = query.limit.unwrap_or(DEFAULT_LOG_LIMIT);
    if limit == 0 || limit > MAX_LOG_ENTRIES {
        return Err(ObserverError::InvalidQuery(format!(
            "limit must be between 1 and {MAX_LOG_ENTRIES}"
        )));
    }

    let entries = state.controller.log_entries(limit).await;
    Ok(Json(serde_json::json!({
        "count": entries.len(),
        "entries": entries,
    })))
}
