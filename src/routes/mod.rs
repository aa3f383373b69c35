//! HTTP control surface.
//!
//! | Method   | Path                  | Operation                         |
//! |----------|-----------------------|-----------------------------------|
//! | GET      | `/health`             | liveness (never authenticated)    |
//! | POST     | `/api/control/toggle` | `{"state":"on"\|"off"}` → RunFlag |
//! | GET      | `/api/control/status` | RunFlag + loop statistics         |
//! | POST     | `/api/predict`        | on-demand forecast                |
//! | GET      | `/api/trades`         | ledger, newest first (`?limit=`)  |
//! | GET (WS) | `/ws/monitor`         | live loop events                  |

pub mod control;
pub mod forecast;
pub mod ledger;
pub mod monitor;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::{require_api_key, ApiKey};
use crate::state::SharedState;

pub fn router(state: SharedState, api_key: ApiKey) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health",              get(control::health))
        // ── Control ───────────────────────────────────────────────────────────
        .route("/api/control/toggle",  post(control::toggle))
        .route("/api/control/status",  get(control::status))
        // ── Forecast ──────────────────────────────────────────────────────────
        .route("/api/predict",         post(forecast::predict))
        // ── Ledger ────────────────────────────────────────────────────────────
        .route("/api/trades",          get(ledger::recent_trades))
        // ── Monitor ───────────────────────────────────────────────────────────
        .route("/ws/monitor",          get(monitor::ws_monitor))
        // ── Middleware ────────────────────────────────────────────────────────
        .layer(axum::middleware::from_fn_with_state(api_key, require_api_key))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
