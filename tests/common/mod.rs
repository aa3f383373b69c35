#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use autopilot::control::RunFlag;
use autopilot::engine::{ControlLoop, LoopConfig, LoopStats, Thresholds};
use autopilot::events::EventBus;
use autopilot::gateway::{Forecaster, Gateway, GatewayError, MarketData};
use autopilot::ledger::{LedgerError, LedgerStore, MemoryLedger, SharedLedger};
use autopilot::models::{Bar, NewTradeEvent, TradeEvent};
use autopilot::surface::ControlSurface;

pub const PAIR: &str = "BTC/USDT";

// ─── Scripted Market ──────────────────────────────────────────────────────────

/// Replays a queue of latest closes (or failures), one per call.  An
/// exhausted script reports `DataUnavailable`.
#[derive(Default)]
pub struct ScriptedMarket {
    script: Mutex<VecDeque<Result<f64, GatewayError>>>,
    calls:  AtomicUsize,
}

impl ScriptedMarket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_closes(closes: &[f64]) -> Self {
        let market = Self::new();
        for close in closes {
            market.push(Ok(*close));
        }
        market
    }

    pub fn push(&self, step: Result<f64, GatewayError>) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketData for ScriptedMarket {
    async fn fetch_series(&self, _: &str, _: &str, _: usize) -> Result<Vec<Bar>, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::DataUnavailable("script exhausted".into())));
        let close = step?;
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        Ok(vec![Bar::flat(ts, close, 1.0)])
    }
}

// ─── Scripted Forecaster ──────────────────────────────────────────────────────

#[derive(Default)]
pub struct ScriptedForecaster {
    script: Mutex<VecDeque<Result<f64, GatewayError>>>,
    calls:  AtomicUsize,
}

impl ScriptedForecaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predictions(predictions: &[f64]) -> Self {
        let forecaster = Self::new();
        for p in predictions {
            forecaster.push(Ok(*p));
        }
        forecaster
    }

    pub fn push(&self, step: Result<f64, GatewayError>) {
        self.script.lock().unwrap().push_back(step);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Forecaster for ScriptedForecaster {
    async fn forecast(&self, _: &[Bar]) -> Result<f64, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::PredictionUnavailable("script exhausted".into())))
    }
}

// ─── Failing Ledger ───────────────────────────────────────────────────────────

/// Every append fails as if the disk were full.
#[derive(Default)]
pub struct FailingLedger {
    attempts: AtomicUsize,
}

impl FailingLedger {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for FailingLedger {
    async fn append(&self, _: NewTradeEvent) -> Result<TradeEvent, LedgerError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LedgerError::Io(io::Error::new(io::ErrorKind::Other, "disk full")))
    }

    async fn recent(&self, _: usize) -> Result<Vec<TradeEvent>, LedgerError> {
        Ok(Vec::new())
    }
}

// ─── Slow Ledger ──────────────────────────────────────────────────────────────

/// Memory ledger whose appends take `delay` to complete.
pub struct SlowLedger {
    pub inner: Arc<MemoryLedger>,
    delay:     Duration,
    started:   AtomicUsize,
}

impl SlowLedger {
    pub fn new(delay: Duration) -> Self {
        Self { inner: memory_ledger(), delay, started: AtomicUsize::new(0) }
    }

    pub fn appends_started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for SlowLedger {
    async fn append(&self, event: NewTradeEvent) -> Result<TradeEvent, LedgerError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.inner.append(event).await
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TradeEvent>, LedgerError> {
        self.inner.recent(limit).await
    }
}

// ─── Harness ──────────────────────────────────────────────────────────────────

pub struct Harness {
    pub market:     Arc<ScriptedMarket>,
    pub forecaster: Arc<ScriptedForecaster>,
    pub gateway:    Gateway,
    pub run_flag:   RunFlag,
    pub stats:      Arc<LoopStats>,
    pub events:     EventBus,
}

impl Harness {
    pub fn new(market: ScriptedMarket, forecaster: ScriptedForecaster, running: bool) -> Self {
        let market = Arc::new(market);
        let forecaster = Arc::new(forecaster);
        let gateway = Gateway::new(
            market.clone(),
            forecaster.clone(),
            "1h",
            50,
            Duration::from_secs(5),
        );
        Self {
            market,
            forecaster,
            gateway,
            run_flag: RunFlag::new(running),
            stats:    Arc::new(LoopStats::new()),
            events:   EventBus::default(),
        }
    }

    pub fn loop_config() -> LoopConfig {
        LoopConfig {
            pair:           PAIR.to_string(),
            cycle_interval: Duration::from_secs(60),
            idle_poll:      Duration::from_secs(10),
            thresholds:     Thresholds::default(),
        }
    }

    pub fn control_loop(&self, ledger: SharedLedger) -> ControlLoop {
        ControlLoop::new(
            Self::loop_config(),
            self.gateway.clone(),
            ledger,
            self.run_flag.clone(),
            self.stats.clone(),
            self.events.clone(),
        )
    }

    pub fn surface(&self, ledger: SharedLedger) -> ControlSurface {
        ControlSurface::new(
            self.run_flag.clone(),
            self.gateway.clone(),
            ledger,
            self.stats.clone(),
            self.events.clone(),
            PAIR,
            500,
        )
    }
}

pub fn memory_ledger() -> Arc<MemoryLedger> {
    Arc::new(MemoryLedger::new())
}
