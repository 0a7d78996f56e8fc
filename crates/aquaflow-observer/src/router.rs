//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled so a separately served front end can call
//! it.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::commands;
use crate::handlers;
use crate::state::AppState;
use crate::ws;

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /ws/frames` -- `WebSocket` stream of frames, samples and log entries
/// - `GET /api/status` -- current frame and display view
/// - `GET /api/samples` -- samples of the current run
/// - `GET /api/log` -- operator log
/// - `POST /api/commands/start` -- start a run
/// - `POST /api/commands/reset` -- cancel and reset
/// - `POST /api/commands/speed` -- cycle or set the speed multiplier
/// - `POST /api/commands/regenerate-filter` -- reset filter wear
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // WebSocket
        .route("/ws/frames", get(ws::ws_frames))
        // Reads
        .route("/api/status", get(handlers::status))
        .route("/api/samples", get(handlers::samples))
        .route("/api/log", get(handlers::log))
        // Commands
        .route("/api/commands/start", post(commands::start))
        .route("/api/commands/reset", post(commands::reset))
        .route("/api/commands/speed", post(commands::speed))
        .route(
            "/api/commands/regenerate-filter",
            post(commands::regenerate_filter),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
