//! # gateway::forecast
//!
//! Forecaster implementations.
//!
//! | Forecaster        | Selected when          | Model                                  |
//! |-------------------|------------------------|----------------------------------------|
//! | `HttpForecaster`  | `FORECAST_URL` is set  | remote model service (POST series)     |
//! | `TrendForecaster` | default                | least-squares line over last N closes  |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{Forecaster, GatewayError};
use crate::models::bar::{closes, Bar};

// ─── Remote Model ─────────────────────────────────────────────────────────────

/// Request body sent to the model service.
#[derive(Debug, Serialize)]
struct ForecastRequest<'a> {
    series: &'a [Bar],
}

/// Expected response `{ "predicted_price": 67250.5 }`.
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    predicted_price: f64,
}

pub struct HttpForecaster {
    client: reqwest::Client,
    url:    String,
}

impl HttpForecaster {
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self { client, url: url.to_string() }
    }
}

#[async_trait]
impl Forecaster for HttpForecaster {
    async fn forecast(&self, series: &[Bar]) -> Result<f64, GatewayError> {
        let response = self
            .client
            .post(&self.url)
            .json(&ForecastRequest { series })
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %self.url, "Model service unreachable");
                GatewayError::PredictionUnavailable(format!("model service unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::PredictionUnavailable(format!(
                "model service HTTP {status}: {body}"
            )));
        }

        let parsed: ForecastResponse = response.json().await.map_err(|e| {
            GatewayError::PredictionUnavailable(format!("model response parse error: {e}"))
        })?;

        Ok(parsed.predicted_price)
    }
}

// ─── Built-in Trend Model ─────────────────────────────────────────────────────

/// Fits `close = a + b·t` over the last `window` closes and extrapolates one
/// bar ahead.
pub struct TrendForecaster {
    window: usize,
}

impl TrendForecaster {
    pub fn new(window: usize) -> Self {
        Self { window: window.max(2) }
    }

    pub fn predict(&self, closes: &[f64]) -> Result<f64, GatewayError> {
        if closes.len() < self.window {
            return Err(GatewayError::PredictionUnavailable(format!(
                "need {} closes, have {}",
                self.window,
                closes.len()
            )));
        }

        let ys = &closes[closes.len() - self.window..];
        let n = ys.len() as f64;
        let mean_x = (n - 1.0) / 2.0;
        let mean_y = ys.iter().sum::<f64>() / n;

        let (mut cov, mut var) = (0.0, 0.0);
        for (i, y) in ys.iter().enumerate() {
            let dx = i as f64 - mean_x;
            cov += dx * (y - mean_y);
            var += dx * dx;
        }

        let slope = cov / var;
        let predicted = mean_y + slope * (n - mean_x);
        debug!(slope, predicted, window = self.window, "Trend forecast");
        Ok(predicted)
    }
}

#[async_trait]
impl Forecaster for TrendForecaster {
    async fn forecast(&self, series: &[Bar]) -> Result<f64, GatewayError> {
        self.predict(&closes(series))
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
