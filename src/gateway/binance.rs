//! # gateway::binance
//!
//! Kline source backed by the Binance public REST API.
//!
//! `GET {base}/api/v3/klines?symbol=BTCUSDT&interval=1h&limit=200`
//!
//! Each kline is a JSON array:
//! ```json
//! [1499040000000, "0.016", "0.080", "0.015", "0.015", "148976.1", 1499644799999, ...]
//! ```
//! open time (ms), open, high, low, close, volume; the rest is ignored.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, error};

use super::{GatewayError, MarketData};
use crate::models::Bar;

pub struct BinanceMarket {
    client:   reqwest::Client,
    base_url: String,
}

impl BinanceMarket {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// `"BTC/USDT"` → `"BTCUSDT"`
pub fn exchange_symbol(pair: &str) -> String {
    pair.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_uppercase()
}

#[async_trait]
impl MarketData for BinanceMarket {
    async fn fetch_series(
        &self,
        pair: &str,
        interval: &str,
        count: usize,
    ) -> Result<Vec<Bar>, GatewayError> {
        let url = format!("{}/api/v3/klines", self.base_url);
        let symbol = exchange_symbol(pair);
        let limit = count.to_string();

        debug!(%url, %symbol, interval, count, "Fetching klines");

        let response = self
            .client
            .get(&url)
            .query(&[("symbol", symbol.as_str()), ("interval", interval), ("limit", limit.as_str())])
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Market API unreachable");
                GatewayError::DataUnavailable(format!("market API unreachable: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(http_status = %status, body = %body, "Market API returned HTTP error");
            return Err(GatewayError::DataUnavailable(format!(
                "market API HTTP {status}: {body}"
            )));
        }

        let rows: Vec<Vec<Value>> = response.json().await.map_err(|e| {
            GatewayError::DataUnavailable(format!("kline response parse error: {e}"))
        })?;

        rows.iter().map(Vec::as_slice).map(parse_kline).collect()
    }
}

/// Decodes one kline row.
pub fn parse_kline(row: &[Value]) -> Result<Bar, GatewayError> {
    let malformed = || GatewayError::DataUnavailable(format!("malformed kline: {row:?}"));

    if row.len() < 6 {
        return Err(malformed());
    }

    let open_ms = row[0].as_i64().ok_or_else(malformed)?;
    let timestamp = DateTime::<Utc>::from_timestamp_millis(open_ms).ok_or_else(malformed)?;

    // Prices and volume arrive as decimal strings; accept bare numbers too.
    let num = |v: &Value| -> Option<f64> {
        match v {
            Value::String(s) => s.parse().ok(),
            Value::Number(n) => n.as_f64(),
            _ => None,
        }
    };

    Ok(Bar {
        timestamp,
        open:   num(&row[1]).ok_or_else(malformed)?,
        high:   num(&row[2]).ok_or_else(malformed)?,
        low:    num(&row[3]).ok_or_else(malformed)?,
        close:  num(&row[4]).ok_or_else(malformed)?,
        volume: num(&row[5]).ok_or_else(malformed)?,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
