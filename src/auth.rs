//! # auth: API Key Middleware
//!
//! Protects the control surface with an `X-API-Key` header.
//!
//! ## Mode
//! - `API_KEY` unset (or empty) → **allow all** (dev mode)
//! - `API_KEY` set → every request must carry `X-API-Key: <key>`
//!
//! `/health` is always open.
//!
//! ```bash
//! curl -H "X-API-Key: $API_KEY" -X POST localhost:3000/api/control/toggle -d '{"state":"on"}'
//! ```

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

/// Expected key, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct ApiKey(pub Option<String>);

impl ApiKey {
    pub fn from_env() -> Self {
        Self(std::env::var("API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Axum middleware: checks the X-API-Key header.
pub async fn require_api_key(
    State(expected): State<ApiKey>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let Some(expected) = expected.0.as_deref() else {
        return next.run(request).await;
    };

    let path = request.uri().path();
    if path == "/health" {
        return next.run(request).await;
    }

    let provided = request
        .headers()
        .get("X-API-Key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided == expected {
        next.run(request).await
    } else {
        warn!(path, "❌ Unauthorized request — invalid or missing X-API-Key");
        (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "ok":    false,
                "kind":  "UNAUTHORIZED",
                "error": "Unauthorized: invalid or missing X-API-Key header",
            })),
        )
            .into_response()
    }
}
