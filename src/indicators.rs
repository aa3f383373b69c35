//! # indicators
//!
//! Latest-value technical indicators over a bar series (oldest → newest).
//!
//! Only the most recent value is computed; the loop logs them and the
//! forecast endpoint returns them.  They never feed the position state
//! machine.
//!
//! * SMA(n) : mean of the last n closes
//! * EMA(n) : k = 2/(n+1), seeded with the SMA of the first n closes
//! * RSI(n) : Wilder smoothing; RSI = 100 when there were no losses
//! * OBV    : running volume signed by close-to-close direction

use serde::Serialize;

use crate::models::{bar, Bar};

/// Period used for SMA / EMA / RSI.
pub const DEFAULT_PERIOD: usize = 14;

/// Latest indicator values; `None` while a series is still warming up.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct IndicatorSnapshot {
    pub sma: Option<f64>,
    pub ema: Option<f64>,
    pub rsi: Option<f64>,
    pub obv: Option<f64>,
}

impl IndicatorSnapshot {
    pub fn from_series(series: &[Bar]) -> Self {
        let closes = bar::closes(series);
        Self {
            sma: sma(&closes, DEFAULT_PERIOD),
            ema: ema(&closes, DEFAULT_PERIOD),
            rsi: rsi(&closes, DEFAULT_PERIOD),
            obv: obv(series),
        }
    }
}

pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

pub fn ema(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let k = 2.0 / (period as f64 + 1.0);
    let seed = closes[..period].iter().sum::<f64>() / period as f64;
    Some(
        closes[period..]
            .iter()
            .fold(seed, |prev, close| close * k + prev * (1.0 - k)),
    )
}

pub fn rsi(closes: &[f64], period: usize) -> Option<f64> {
    // n price changes are needed for the first average.
    if period == 0 || closes.len() <= period {
        return None;
    }

    let changes: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();
    let gain = |c: &f64| c.max(0.0);
    let loss = |c: &f64| (-c).max(0.0);

    let mut avg_gain = changes[..period].iter().map(gain).sum::<f64>() / period as f64;
    let mut avg_loss = changes[..period].iter().map(loss).sum::<f64>() / period as f64;

    for change in &changes[period..] {
        avg_gain = (avg_gain * (period - 1) as f64 + gain(change)) / period as f64;
        avg_loss = (avg_loss * (period - 1) as f64 + loss(change)) / period as f64;
    }

    if avg_loss == 0.0 {
        Some(100.0)
    } else {
        Some(100.0 - 100.0 / (1.0 + avg_gain / avg_loss))
    }
}

pub fn obv(series: &[Bar]) -> Option<f64> {
    let first = series.first()?;
    let total = series.windows(2).fold(first.volume, |acc, w| {
        if w[1].close > w[0].close {
            acc + w[1].volume
        } else if w[1].close < w[0].close {
            acc - w[1].volume
        } else {
            acc
        }
    });
    Some(total)
}

// ─── Tests ────────────────────────────────────────────────────────────────────
