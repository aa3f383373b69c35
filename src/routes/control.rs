//! # routes::control
//!
//! Run/pause toggle, status and liveness.

use axum::{
    extract::{rejection::JsonRejection, State},
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::SharedState};

#[derive(Debug, Deserialize)]
pub struct ToggleBody {
    /// `"on"` or `"off"` (case-insensitive)
    pub state: String,
}

// ─── POST /api/control/toggle ─────────────────────────────────────────────────

pub async fn toggle(
    State(state): State<SharedState>,
    body: Result<Json<ToggleBody>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(body) = body.map_err(|e| AppError::InvalidControlInput(e.body_text()))?;
    let running = state.control.set_run_flag_str(&body.state)?;
    let message = if running { "AI Trading ON" } else { "AI Trading OFF" };

    Ok(Json(json!({
        "ok":      true,
        "running": running,
        "message": message,
    })))
}

// ─── GET /api/control/status ──────────────────────────────────────────────────

pub async fn status(State(state): State<SharedState>) -> impl IntoResponse {
    Json(json!({
        "ok":         true,
        "running":    state.control.is_running(),
        "stats":      state.control.stats(),
        "started_at": state.started_at,
    }))
}

// ─── GET /health ──────────────────────────────────────────────────────────────

pub async fn health(State(state): State<SharedState>) -> impl IntoResponse {
    let uptime = Utc::now().signed_duration_since(state.started_at);
    Json(json!({
        "ok":          true,
        "running":     state.control.is_running(),
        "uptime_secs": uptime.num_seconds(),
    }))
}
