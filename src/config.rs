//! # config: Configuration from Environment Variables
//!
//! Read once at startup by the composition root.  `.env` is loaded first via
//! `dotenvy`.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};

use crate::engine::position::Thresholds;

pub const DEFAULT_PAIR: &str = "BTC/USDT";
pub const BINANCE_URL: &str = "https://api.binance.com";

/// Everything the service needs to start.
#[derive(Debug, Clone)]
pub struct Config {
    /// Control surface listen address
    pub bind_addr:        SocketAddr,
    /// Instrument the loop trades, e.g. "BTC/USDT"
    pub pair:             String,
    /// Bar interval requested from the market, e.g. "1h"
    pub bar_interval:     String,
    /// Bars per fetch
    pub bar_lookback:     usize,
    /// Sleep after an active cycle
    pub cycle_interval:   Duration,
    /// Sleep while the loop is paused
    pub idle_poll:        Duration,
    /// Latency cap on one gateway observation
    pub gateway_timeout:  Duration,
    pub thresholds:       Thresholds,
    /// Initial RunFlag value
    pub start_enabled:    bool,
    /// Kline REST base URL, or "mock"
    pub market_url:       String,
    /// Remote model endpoint; None = built-in trend model
    pub forecast_url:     Option<String>,
    /// Closes fitted by the built-in trend model
    pub forecast_window:  usize,
    /// JSON-lines ledger path, or "memory"
    pub ledger_path:      PathBuf,
    /// Postgres ledger (postgres feature only)
    pub database_url:     Option<String>,
    /// Largest `limit` accepted by ledger queries
    pub ledger_max_limit: usize,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let bind_addr = env_or("BIND_ADDR", "0.0.0.0:3000")
            .parse()
            .context("BIND_ADDR must be a socket address, e.g. 0.0.0.0:3000")?;

        let thresholds = Thresholds {
            entry_margin:       margin("ENTRY_MARGIN", 0.01)?,
            stop_loss_margin:   margin("STOP_LOSS_MARGIN", 0.02)?,
            take_profit_margin: margin("TAKE_PROFIT_MARGIN", 0.02)?,
        };

        let config = Self {
            bind_addr,
            pair:             env_or("TRADING_PAIR", DEFAULT_PAIR),
            bar_interval:     env_or("BAR_INTERVAL", "1h"),
            bar_lookback:     parse_env("BAR_LOOKBACK", 200)?,
            cycle_interval:   Duration::from_secs(parse_env("CYCLE_INTERVAL_SECS", 60)?),
            idle_poll:        Duration::from_secs(parse_env("IDLE_POLL_SECS", 10)?),
            gateway_timeout:  Duration::from_secs(parse_env("GATEWAY_TIMEOUT_SECS", 15)?),
            thresholds,
            start_enabled:    parse_flag(&env_or("AI_RUNNING", "false"))
                .context("AI_RUNNING must be on/off/true/false")?,
            market_url:       env_or("MARKET_URL", BINANCE_URL),
            forecast_url:     std::env::var("FORECAST_URL").ok().filter(|s| !s.is_empty()),
            forecast_window:  parse_env("FORECAST_WINDOW", 10)?,
            ledger_path:      PathBuf::from(env_or("LEDGER_PATH", "trades.jsonl")),
            database_url:     std::env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            ledger_max_limit: parse_env("LEDGER_MAX_LIMIT", 500)?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !crate::surface::is_valid_pair(&self.pair) {
            bail!("TRADING_PAIR '{}' must look like BASE/QUOTE", self.pair);
        }
        if self.bar_lookback < self.forecast_window {
            bail!(
                "BAR_LOOKBACK ({}) must be at least FORECAST_WINDOW ({})",
                self.bar_lookback,
                self.forecast_window
            );
        }
        if self.cycle_interval.is_zero() || self.idle_poll.is_zero() || self.gateway_timeout.is_zero() {
            bail!("CYCLE_INTERVAL_SECS, IDLE_POLL_SECS and GATEWAY_TIMEOUT_SECS must be > 0");
        }
        if self.ledger_max_limit == 0 {
            bail!("LEDGER_MAX_LIMIT must be > 0");
        }
        Ok(())
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} must be a number, got '{raw}': {e}")),
        Err(_) => Ok(default),
    }
}

fn margin(key: &str, default: f64) -> anyhow::Result<f64> {
    let value: f64 = parse_env(key, default)?;
    check_margin(key, value)
}

fn check_margin(key: &str, value: f64) -> anyhow::Result<f64> {
    if !(value > 0.0 && value < 1.0) {
        bail!("{key} must be within (0, 1), got {value}");
    }
    Ok(value)
}

/// Accepts `on`/`off` (the toggle vocabulary) plus `true`/`false`/`1`/`0`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1"   => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}
