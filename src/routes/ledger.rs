//! # routes::ledger
//!
//! Trade history, newest first.

use std::collections::HashMap;

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;

use crate::{error::AppError, state::SharedState};

// ─── GET /api/trades?limit=50 ─────────────────────────────────────────────────

pub async fn recent_trades(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let limit = params
        .get("limit")
        .map(|raw| {
            raw.trim().parse::<usize>().map_err(|_| {
                AppError::InvalidControlInput(format!("limit must be a positive integer, got '{raw}'"))
            })
        })
        .transpose()?;

    let trades = state.control.read_ledger(limit).await?;

    Ok(Json(json!({
        "ok":     true,
        "count":  trades.len(),
        "trades": trades,
    })))
}
