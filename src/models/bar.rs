//! # models::bar
//!
//! Defines [`Bar`], one OHLCV candle as delivered by the market side of the
//! gateway.  A series is a `Vec<Bar>` ordered oldest → newest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Open time of the bar (UTC).
    pub timestamp: DateTime<Utc>,
    pub open:      f64,
    pub high:      f64,
    pub low:       f64,
    pub close:     f64,
    pub volume:    f64,
}

impl Bar {
    /// Convenience constructor for a flat bar where every price equals `close`.
    pub fn flat(timestamp: DateTime<Utc>, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open: close,
            high: close,
            low: close,
            close,
            volume,
        }
    }
}

/// Extracts the close column of a series.
pub fn closes(series: &[Bar]) -> Vec<f64> {
    series.iter().map(|b| b.close).collect()
}
