//! # error
//!
//! Control-surface error type.
//!
//! Every handler returns `Result<_, AppError>`.  Axum's `IntoResponse` impl
//! renders a structured JSON body with a stable `kind` so front ends can tell
//! a bad request from an upstream outage without parsing messages:
//!
//! ```json
//! { "ok": false, "kind": "DATA_UNAVAILABLE", "error": "market data unavailable: ..." }
//! ```

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::gateway::GatewayError;
use crate::ledger::LedgerError;

#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed toggle / query input.  Never reaches the loop.
    #[error("Invalid control input: {0}")]
    InvalidControlInput(String),

    /// Market bars could not be fetched.
    #[error("{0}")]
    DataUnavailable(String),

    /// The forecaster failed.
    #[error("{0}")]
    PredictionUnavailable(String),

    /// The gateway exceeded its latency cap.
    #[error("{0}")]
    GatewayTimeout(String),

    /// The ledger could not be read or written.
    #[error("Ledger failure: {0}")]
    LedgerFailure(#[from] LedgerError),
}

impl AppError {
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidControlInput(_)   => "INVALID_CONTROL_INPUT",
            AppError::DataUnavailable(_)       => "DATA_UNAVAILABLE",
            AppError::PredictionUnavailable(_) => "PREDICTION_UNAVAILABLE",
            AppError::GatewayTimeout(_)        => "GATEWAY_TIMEOUT",
            AppError::LedgerFailure(_)         => "LEDGER_FAILURE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidControlInput(_)   => StatusCode::BAD_REQUEST,
            AppError::DataUnavailable(_)       => StatusCode::BAD_GATEWAY,
            AppError::PredictionUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::GatewayTimeout(_)        => StatusCode::GATEWAY_TIMEOUT,
            AppError::LedgerFailure(_)         => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let message = err.to_string();
        match err {
            GatewayError::DataUnavailable(_)       => AppError::DataUnavailable(message),
            GatewayError::PredictionUnavailable(_) => AppError::PredictionUnavailable(message),
            GatewayError::Timeout(_)               => AppError::GatewayTimeout(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "ok":    false,
            "kind":  self.kind(),
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
