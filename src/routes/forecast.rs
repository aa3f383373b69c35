//! # routes::forecast
//!
//! On-demand forecast.  Calls the gateway exactly like the loop does but
//! never touches the position or the ledger.

use axum::{body::Bytes, extract::State, response::IntoResponse, Json};
use serde::Deserialize;
use serde_json::json;

use crate::{error::AppError, state::SharedState};

#[derive(Debug, Default, Deserialize)]
pub struct PredictBody {
    /// Defaults to the loop's configured pair.
    #[serde(default)]
    pub pair: Option<String>,
}

// ─── POST /api/predict ────────────────────────────────────────────────────────

/// Body is optional: empty → `{}`.
pub async fn predict(
    State(state): State<SharedState>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let body: PredictBody = if body.iter().all(u8::is_ascii_whitespace) {
        PredictBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::InvalidControlInput(format!("invalid JSON body: {e}")))?
    };

    let observation = state.control.query_forecast(body.pair.as_deref()).await?;

    Ok(Json(json!({
        "ok":              true,
        "pair":            observation.pair,
        "predicted_price": observation.predicted_price,
        "current_price":   observation.current_price,
        "bar_time":        observation.bar_time,
        "indicators":      observation.indicators,
    })))
}
