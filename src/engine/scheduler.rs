//! # engine::scheduler
//!
//! **Control Loop**: the background task that trades.
//!
//! ## One cycle
//! ```text
//! 1. RunFlag off?          → Paused, sleep idle_poll (cheap re-check)
//! 2. Gateway::observe      → fetch bars + forecast, capped by timeout
//!    └─ failure            → log, count, skip; sleep cycle_interval; retry forever
//! 3. PositionMachine::step → at most one BUY / SELL
//! 4. LedgerStore::append   → durable record
//!    └─ failure            → log, count; position change is NOT rolled back
//! 5. sleep cycle_interval
//! ```
//!
//! Shutdown may abandon a sleep or an in-flight gateway call.  Once step 3
//! starts the cycle always runs to the end, so a started append is never cut
//! short.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::control::RunFlag;
use crate::engine::position::{PositionMachine, PositionState, Thresholds, Transition};
use crate::engine::stats::LoopStats;
use crate::events::{EventBus, WsEvent};
use crate::gateway::{Gateway, GatewayError, Observation};
use crate::ledger::SharedLedger;
use crate::models::TradeEvent;

// ─── Config ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub pair:           String,
    pub cycle_interval: Duration,
    pub idle_poll:      Duration,
    pub thresholds:     Thresholds,
}

impl LoopConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            pair:           config.pair.clone(),
            cycle_interval: config.cycle_interval,
            idle_poll:      config.idle_poll,
            thresholds:     config.thresholds,
        }
    }
}

// ─── Outcome ──────────────────────────────────────────────────────────────────

/// What one cycle did.  Returned for logging and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// RunFlag was off at the start of the cycle; no gateway call made.
    Paused,
    /// Gateway failed; state machine not invoked.
    GatewayFailed(GatewayError),
    /// Gateway succeeded, no guard fired.
    Hold { position: PositionState },
    /// A transition fired and its record is durable.
    Recorded { trade: TradeEvent, transition: Transition },
    /// A transition fired but the append failed.  The position still moved.
    LedgerFailed { transition: Transition, error: String },
}

impl CycleOutcome {
    fn next_sleep(&self, config: &LoopConfig) -> Duration {
        match self {
            CycleOutcome::Paused => config.idle_poll,
            _ => config.cycle_interval,
        }
    }
}

// ─── ControlLoop ──────────────────────────────────────────────────────────────

pub struct ControlLoop {
    config:   LoopConfig,
    gateway:  Gateway,
    ledger:   SharedLedger,
    run_flag: RunFlag,
    /// Owned by this task alone.
    machine:  PositionMachine,
    stats:    Arc<LoopStats>,
    events:   EventBus,
}

impl ControlLoop {
    pub fn new(
        config: LoopConfig,
        gateway: Gateway,
        ledger: SharedLedger,
        run_flag: RunFlag,
        stats: Arc<LoopStats>,
        events: EventBus,
    ) -> Self {
        let machine = PositionMachine::new(config.thresholds);
        Self { config, gateway, ledger, run_flag, machine, stats, events }
    }

    pub fn position(&self) -> PositionState {
        self.machine.state()
    }

    /// Runs exactly one cycle without sleeping.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        if !self.is_active() {
            return CycleOutcome::Paused;
        }
        let observed = self.gateway.observe(&self.config.pair).await;
        self.commit(observed).await
    }

    /// Spawns [`ControlLoop::run`] on the runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    /// Cycles until `shutdown` flips to `true` (or its sender is dropped).
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            pair           = %self.config.pair,
            cycle_interval = ?self.config.cycle_interval,
            idle_poll      = ?self.config.idle_poll,
            gateway_cap    = ?self.gateway.timeout(),
            running        = self.run_flag.is_enabled(),
            "🔁 Control loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let outcome = if self.is_active() {
                let observed = tokio::select! {
                    biased;
                    _ = shutdown.changed() => break,
                    observed = self.gateway.observe(&self.config.pair) => observed,
                };
                self.commit(observed).await
            } else {
                CycleOutcome::Paused
            };

            let pause = outcome.next_sleep(&self.config);
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }

        info!(position = ?self.machine.state(), "🛑 Control loop stopped");
    }

    /// Reads the RunFlag once for this cycle.
    fn is_active(&self) -> bool {
        if self.run_flag.is_enabled() {
            true
        } else {
            self.stats.record_idle_poll();
            debug!("Loop paused — idle poll");
            false
        }
    }

    async fn commit(&mut self, observed: Result<Observation, GatewayError>) -> CycleOutcome {
        self.stats.record_cycle(Utc::now());
        let pair = self.config.pair.clone();

        // ── Gateway result ────────────────────────────────────────────────────
        let observation = match observed {
            Ok(observation) => observation,
            Err(e) => {
                self.stats.record_gateway_failure();
                warn!(
                    pair  = %pair,
                    kind  = e.kind(),
                    error = %e,
                    "⚠️ Gateway failed — skipping cycle, will retry next interval"
                );
                self.events.publish(&WsEvent::CycleFailed {
                    pair,
                    kind:  e.kind(),
                    error: e.to_string(),
                });
                return CycleOutcome::GatewayFailed(e);
            }
        };

        debug!(
            pair      = %pair,
            current   = observation.current_price,
            predicted = observation.predicted_price,
            bar_time  = %observation.bar_time,
            rsi       = ?observation.indicators.rsi,
            ema       = ?observation.indicators.ema,
            "Observation"
        );

        // ── State machine ─────────────────────────────────────────────────────
        let Some(transition) = self
            .machine
            .step(observation.current_price, observation.predicted_price)
        else {
            return CycleOutcome::Hold { position: self.machine.state() };
        };

        let exit_reason = match transition {
            Transition::Close { reason, entry_price, .. } => {
                info!(
                    pair = %pair,
                    price = transition.price(),
                    entry_price,
                    reason = ?reason,
                    "📤 Closing position"
                );
                Some(reason)
            }
            Transition::Open { price } => {
                info!(
                    pair = %pair,
                    price,
                    predicted = observation.predicted_price,
                    "📥 Opening position"
                );
                None
            }
        };

        // ── Ledger ────────────────────────────────────────────────────────────
        let decision = transition.to_event(&pair);
        match self.ledger.append(decision.clone()).await {
            Ok(trade) => {
                self.stats.record_trade();
                info!(id = trade.id, action = %trade.action, price = trade.price, "📒 Trade recorded");
                self.events.publish(&WsEvent::TradeRecorded {
                    trade: trade.clone(),
                    exit_reason,
                });
                CycleOutcome::Recorded { trade, transition }
            }
            Err(e) => {
                self.stats.record_ledger_failure();
                error!(
                    pair   = %pair,
                    action = %decision.action,
                    price  = decision.price,
                    error  = %e,
                    position = ?self.machine.state(),
                    "❌ Ledger write failed — position change kept in memory"
                );
                self.events.publish(&WsEvent::LedgerWriteFailed {
                    trade: decision,
                    error: e.to_string(),
                });
                CycleOutcome::LedgerFailed { transition, error: e.to_string() }
            }
        }
    }
}
