//! # surface
//!
//! **Control Surface adapter**: the operations front ends call.
//!
//! | Operation        | Touches                                  |
//! |------------------|------------------------------------------|
//! | `set_run_flag`   | RunFlag only                             |
//! | `query_forecast` | Gateway only (read-only, no ledger write)|
//! | `read_ledger`    | LedgerStore::recent                      |
//!
//! Input validation lives here so malformed requests are rejected as
//! `InvalidControlInput` before anything reaches the loop.  PositionState is
//! not reachable from this type.

use std::sync::{Arc, Mutex};

use tracing::info;

use crate::control::RunFlag;
use crate::engine::stats::{LoopStats, StatsSnapshot};
use crate::error::AppError;
use crate::events::{EventBus, WsEvent};
use crate::gateway::{Gateway, Observation};
use crate::ledger::SharedLedger;
use crate::models::TradeEvent;

/// Default page size for ledger reads.
pub const DEFAULT_LEDGER_LIMIT: usize = 50;

#[derive(Clone)]
pub struct ControlSurface {
    run_flag:     RunFlag,
    gateway:      Gateway,
    ledger:       SharedLedger,
    stats:        Arc<LoopStats>,
    events:       EventBus,
    default_pair: String,
    max_limit:    usize,
    /// Orders each flag swap with its broadcast.
    toggle_lock:  Arc<Mutex<()>>,
}

impl ControlSurface {
    pub fn new(
        run_flag: RunFlag,
        gateway: Gateway,
        ledger: SharedLedger,
        stats: Arc<LoopStats>,
        events: EventBus,
        default_pair: impl Into<String>,
        max_limit: usize,
    ) -> Self {
        Self {
            run_flag,
            gateway,
            ledger,
            stats,
            events,
            default_pair: default_pair.into(),
            max_limit,
            toggle_lock: Arc::new(Mutex::new(())),
        }
    }

    // ─── Toggle ───────────────────────────────────────────────────────────────

    /// Idempotent; seen by the loop at its next wake-up.
    pub fn set_run_flag(&self, enabled: bool) -> bool {
        // Held across swap and publish so the last LoopToggled event always
        // matches the flag.  The guarded data is `()`, so poisoning is moot.
        let _guard = self.toggle_lock.lock().unwrap_or_else(|e| e.into_inner());
        let previous = self.run_flag.set(enabled);
        if previous != enabled {
            info!(running = enabled, "🎛️ Run flag changed");
            self.events.publish(&WsEvent::LoopToggled { running: enabled });
        }
        enabled
    }

    /// Toggle from the wire vocabulary (`"on"` / `"off"`).
    pub fn set_run_flag_str(&self, state: &str) -> Result<bool, AppError> {
        let enabled = match state.trim().to_ascii_lowercase().as_str() {
            "on"  => true,
            "off" => false,
            _ => {
                return Err(AppError::InvalidControlInput(format!(
                    "invalid state '{state}'. Use 'on' or 'off'"
                )))
            }
        };
        Ok(self.set_run_flag(enabled))
    }

    pub fn is_running(&self) -> bool {
        self.run_flag.is_enabled()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // ─── Forecast ─────────────────────────────────────────────────────────────

    /// On-demand forecast; `None` uses the loop's pair.
    pub async fn query_forecast(&self, pair: Option<&str>) -> Result<Observation, AppError> {
        let pair = pair.map(str::trim).unwrap_or(self.default_pair.as_str());
        if !is_valid_pair(pair) {
            return Err(AppError::InvalidControlInput(format!(
                "invalid pair '{pair}'. Expected BASE/QUOTE, e.g. BTC/USDT"
            )));
        }
        Ok(self.gateway.forecast(pair).await?)
    }

    // ─── Ledger ───────────────────────────────────────────────────────────────

    pub async fn read_ledger(&self, limit: Option<usize>) -> Result<Vec<TradeEvent>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_LEDGER_LIMIT);
        if limit == 0 || limit > self.max_limit {
            return Err(AppError::InvalidControlInput(format!(
                "limit must be within 1..={}, got {limit}",
                self.max_limit
            )));
        }
        Ok(self.ledger.recent(limit).await?)
    }
}

/// `BASE/QUOTE` with ASCII alphanumeric halves.
pub fn is_valid_pair(pair: &str) -> bool {
    let Some((base, quote)) = pair.split_once('/') else {
        return false;
    };
    let ok = |s: &str| !s.is_empty() && s.len() <= 16 && s.chars().all(|c| c.is_ascii_alphanumeric());
    ok(base) && ok(quote)
}
