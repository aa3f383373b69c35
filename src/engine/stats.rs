//! # engine::stats
//!
//! Loop counters shared with the control surface.  Written only by the
//! control loop; read by `/api/control/status` and WebSocket snapshots.
//! Carries nothing about the position itself.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Default)]
pub struct LoopStats {
    cycles:           AtomicU64,
    idle_polls:       AtomicU64,
    gateway_failures: AtomicU64,
    trades_recorded:  AtomicU64,
    ledger_failures:  AtomicU64,
    /// Unix millis of the last active cycle; 0 = never.
    last_cycle_ms:    AtomicI64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub cycles:           u64,
    pub idle_polls:       u64,
    pub gateway_failures: u64,
    pub trades_recorded:  u64,
    pub ledger_failures:  u64,
    pub last_cycle_at:    Option<DateTime<Utc>>,
}

impl LoopStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, at: DateTime<Utc>) {
        self.cycles.fetch_add(1, Ordering::Relaxed);
        self.last_cycle_ms.store(at.timestamp_millis(), Ordering::Relaxed);
    }

    pub fn record_idle_poll(&self) {
        self.idle_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_gateway_failure(&self) {
        self.gateway_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trade(&self) {
        self.trades_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ledger_failure(&self) {
        self.ledger_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let last_ms = self.last_cycle_ms.load(Ordering::Relaxed);
        StatsSnapshot {
            cycles:           self.cycles.load(Ordering::Relaxed),
            idle_polls:       self.idle_polls.load(Ordering::Relaxed),
            gateway_failures: self.gateway_failures.load(Ordering::Relaxed),
            trades_recorded:  self.trades_recorded.load(Ordering::Relaxed),
            ledger_failures:  self.ledger_failures.load(Ordering::Relaxed),
            last_cycle_at:    (last_ms != 0)
                .then(|| DateTime::<Utc>::from_timestamp_millis(last_ms))
                .flatten(),
        }
    }
}
