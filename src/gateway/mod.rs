//! # gateway
//!
//! **Market & Forecast Gateway**: the loop's only window on the outside
//! world.
//!
//! ```text
//!  Gateway::observe(pair)
//!     ├─ MarketData::fetch_series(pair, interval, lookback)  → Vec<Bar>
//!     ├─ validate last close                                  (DataUnavailable)
//!     ├─ Forecaster::forecast(&series)                        → predicted price
//!     ├─ validate prediction                                  (PredictionUnavailable)
//!     └─ whole call capped by `timeout`                       (Timeout)
//! ```
//!
//! Both collaborators are trait objects so the loop, the control surface and
//! the tests can swap Binance / mock / scripted sources freely.

pub mod binance;
pub mod forecast;
pub mod mock;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::Config;
use crate::indicators::IndicatorSnapshot;
use crate::models::Bar;

pub use binance::BinanceMarket;
pub use forecast::{HttpForecaster, TrendForecaster};
pub use mock::MockMarket;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GatewayError {
    /// Bars could not be fetched or were unusable.
    #[error("market data unavailable: {0}")]
    DataUnavailable(String),

    /// The forecaster failed or produced an unusable value.
    #[error("prediction unavailable: {0}")]
    PredictionUnavailable(String),

    /// The observation did not finish within the latency cap.
    #[error("gateway timed out after {0:?}")]
    Timeout(Duration),
}

impl GatewayError {
    /// Stable machine-readable kind, shared by logs, events and HTTP bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::DataUnavailable(_)       => "DATA_UNAVAILABLE",
            GatewayError::PredictionUnavailable(_) => "PREDICTION_UNAVAILABLE",
            GatewayError::Timeout(_)               => "GATEWAY_TIMEOUT",
        }
    }
}

// ─── Collaborator Traits ──────────────────────────────────────────────────────

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Bars ordered oldest → newest.
    async fn fetch_series(
        &self,
        pair: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, GatewayError>;
}

#[async_trait]
pub trait Forecaster: Send + Sync {
    /// Predicted next price for the series.
    async fn forecast(&self, series: &[Bar]) -> Result<f64, GatewayError>;
}

// ─── Observation ──────────────────────────────────────────────────────────────

/// One successful gateway round-trip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub pair:            String,
    /// Close of the latest bar.
    pub current_price:   f64,
    pub predicted_price: f64,
    /// Open time of the latest bar.
    pub bar_time:        DateTime<Utc>,
    pub indicators:      IndicatorSnapshot,
}

// ─── Gateway ──────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct Gateway {
    market:     Arc<dyn MarketData>,
    forecaster: Arc<dyn Forecaster>,
    interval:   String,
    lookback:   usize,
    timeout:    Duration,
}

impl Gateway {
    pub fn new(
        market: Arc<dyn MarketData>,
        forecaster: Arc<dyn Forecaster>,
        interval: impl Into<String>,
        lookback: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            market,
            forecaster,
            interval: interval.into(),
            lookback,
            timeout,
        }
    }

    /// Wires the concrete sources selected by configuration.
    ///
    /// * `MARKET_URL=mock` → [`MockMarket`], otherwise [`BinanceMarket`]
    /// * `FORECAST_URL` set → [`HttpForecaster`], otherwise [`TrendForecaster`]
    pub fn from_config(config: &Config, client: reqwest::Client) -> Self {
        let market: Arc<dyn MarketData> = if config.market_url == "mock" {
            tracing::warn!("MARKET_URL=mock — using synthetic market data");
            Arc::new(MockMarket::default())
        } else {
            Arc::new(BinanceMarket::new(client.clone(), &config.market_url))
        };

        let forecaster: Arc<dyn Forecaster> = match &config.forecast_url {
            Some(url) => Arc::new(HttpForecaster::new(client, url)),
            None      => Arc::new(TrendForecaster::new(config.forecast_window)),
        };

        Self::new(
            market,
            forecaster,
            config.bar_interval.clone(),
            config.bar_lookback,
            config.gateway_timeout,
        )
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch + forecast under a single latency cap.
    pub async fn observe(&self, pair: &str) -> Result<Observation, GatewayError> {
        match tokio::time::timeout(self.timeout, self.observe_uncapped(pair)).await {
            Ok(result) => result,
            Err(_)     => Err(GatewayError::Timeout(self.timeout)),
        }
    }

    /// On-demand forecast for the control surface.  Same path as the loop,
    /// no side effects.
    pub async fn forecast(&self, pair: &str) -> Result<Observation, GatewayError> {
        self.observe(pair).await
    }

    async fn observe_uncapped(&self, pair: &str) -> Result<Observation, GatewayError> {
        let series = self
            .market
            .fetch_series(pair, &self.interval, self.lookback)
            .await?;

        let last = series
            .last()
            .ok_or_else(|| GatewayError::DataUnavailable(format!("empty series for {pair}")))?;

        if !last.close.is_finite() || last.close <= 0.0 {
            return Err(GatewayError::DataUnavailable(format!(
                "invalid latest close {} for {pair}",
                last.close
            )));
        }

        let predicted_price = self.forecaster.forecast(&series).await?;
        if !predicted_price.is_finite() || predicted_price <= 0.0 {
            return Err(GatewayError::PredictionUnavailable(format!(
                "invalid predicted price {predicted_price}"
            )));
        }

        Ok(Observation {
            pair:          pair.to_string(),
            current_price: last.close,
            predicted_price,
            bar_time:      last.timestamp,
            indicators:    IndicatorSnapshot::from_series(&series),
        })
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    struct FixedMarket(Vec<Bar>);

    #[async_trait]
    impl MarketData for FixedMarket {
        async fn fetch_series(&self, _: &str, _: &str, _: usize) -> Result<Vec<Bar>, GatewayError> {
            Ok(self.0.clone())
        }
    }

    struct SlowMarket;

    #[async_trait]
    impl MarketData for SlowMarket {
        async fn fetch_series(&self, _: &str, _: &str, _: usize) -> Result<Vec<Bar>, GatewayError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Vec::new())
        }
    }

    struct FixedForecast(f64);

    #[async_trait]
    impl Forecaster for FixedForecast {
        async fn forecast(&self, _: &[Bar]) -> Result<f64, GatewayError> {
            Ok(self.0)
        }
    }

    fn gateway(market: impl MarketData + 'static, predicted: f64) -> Gateway {
        Gateway::new(
            Arc::new(market),
            Arc::new(FixedForecast(predicted)),
            "1h",
            200,
            Duration::from_secs(5),
        )
    }

    fn bar(close: f64) -> Bar {
        Bar::flat(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(), close, 1.0)
    }

    #[tokio::test]
    async fn test_observe_uses_latest_close() {
        let gw = gateway(FixedMarket(vec![bar(90.0), bar(100.0)]), 102.0);
        let obs = gw.observe("BTC/USDT").await.unwrap();
        assert_eq!(obs.current_price, 100.0);
        assert_eq!(obs.predicted_price, 102.0);
        assert_eq!(obs.pair, "BTC/USDT");
    }

    #[tokio::test]
    async fn test_empty_series_is_data_unavailable() {
        let gw = gateway(FixedMarket(vec![]), 102.0);
        let err = gw.observe("BTC/USDT").await.unwrap_err();
        assert_eq!(err.kind(), "DATA_UNAVAILABLE");
    }

    #[tokio::test]
    async fn test_bad_close_is_data_unavailable() {
        let gw = gateway(FixedMarket(vec![bar(f64::NAN)]), 102.0);
        assert!(matches!(gw.observe("X/Y").await, Err(GatewayError::DataUnavailable(_))));
    }

    #[tokio::test]
    async fn test_non_finite_prediction_is_rejected() {
        let gw = gateway(FixedMarket(vec![bar(100.0)]), f64::INFINITY);
        assert!(matches!(
            gw.observe("BTC/USDT").await,
            Err(GatewayError::PredictionUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_market_times_out() {
        let gw = gateway(SlowMarket, 102.0);
        let err = gw.observe("BTC/USDT").await.unwrap_err();
        assert_eq!(err, GatewayError::Timeout(Duration::from_secs(5)));
    }
}
