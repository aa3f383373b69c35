//! # gateway::mock
//!
//! Synthetic market for development without network access
//! (`MARKET_URL=mock`).  A slow sine swing around a base price.  Each hourly
//! bar's prices depend only on its open time, so every caller sees the same
//! series and the market moves on by one bar per hour.

use async_trait::async_trait;
use chrono::{DateTime, Duration, DurationRound, Utc};

use super::{GatewayError, MarketData};
use crate::models::Bar;

pub struct MockMarket {
    base_price: f64,
    amplitude:  f64,
}

impl MockMarket {
    pub fn new(base_price: f64, amplitude: f64) -> Self {
        Self { base_price, amplitude }
    }

    fn price_at(&self, step: i64) -> f64 {
        self.base_price * (1.0 + self.amplitude * (step as f64 / 8.0).sin())
    }

    /// `count` hourly bars, the last one opening at `last_open`.
    fn series_ending_at(&self, last_open: DateTime<Utc>, count: usize) -> Vec<Bar> {
        let last_step = last_open.timestamp().div_euclid(3600);

        (0..count as i64)
            .map(|i| {
                let back = count as i64 - 1 - i;
                let step = last_step - back;
                let close = self.price_at(step);
                let open = self.price_at(step - 1);
                Bar {
                    timestamp: last_open - Duration::hours(back),
                    open,
                    high: open.max(close),
                    low: open.min(close),
                    close,
                    volume: 10.0 + step.rem_euclid(7) as f64,
                }
            })
            .collect()
    }
}

impl Default for MockMarket {
    fn default() -> Self {
        Self::new(67_000.0, 0.03)
    }
}

#[async_trait]
impl MarketData for MockMarket {
    async fn fetch_series(
        &self,
        _pair: &str,
        _interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, GatewayError> {
        let last_open = Utc::now()
            .duration_trunc(Duration::hours(1))
            .map_err(|e| GatewayError::DataUnavailable(e.to_string()))?;

        Ok(self.series_ending_at(last_open, count))
    }
}
