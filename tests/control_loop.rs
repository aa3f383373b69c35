//! Control loop integration tests.
//!
//! Tests cover:
//! - BUY then take-profit SELL on BTC/USDT, recorded newest first
//! - Gateway failures skip the cycle and leave position and ledger untouched
//! - A paused loop makes no gateway calls until toggled on
//! - Ledger failures keep the in-memory position change
//! - The spawned loop cycles on its interval and stops on shutdown
//! - Pausing a running loop stops gateway calls
//! - A started ledger append finishes despite a toggle and a shutdown

mod common;

use std::sync::Arc;
use std::time::Duration;

use autopilot::control::Shutdown;
use autopilot::engine::{CycleOutcome, ExitReason, PositionState, Transition};
use autopilot::gateway::GatewayError;
use autopilot::ledger::LedgerStore;
use autopilot::models::TradeAction;

use common::*;

#[tokio::test]
async fn test_buy_then_take_profit_end_to_end() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0, 103.0]),
        ScriptedForecaster::with_predictions(&[102.0, 100.0]),
        true,
    );
    let ledger = memory_ledger();
    let mut control = h.control_loop(ledger.clone());

    // Flat, 102 > 100 × 1.01 → BUY at 100
    let outcome = control.run_cycle().await;
    let CycleOutcome::Recorded { trade, transition } = outcome else {
        panic!("expected a recorded BUY, got {outcome:?}");
    };
    assert_eq!(trade.action, TradeAction::Buy);
    assert_eq!(trade.price, 100.0);
    assert_eq!(trade.pair, PAIR);
    assert_eq!(transition, Transition::Open { price: 100.0 });
    assert_eq!(control.position(), PositionState::Long { entry_price: 100.0 });

    // Long at 100, 103 ≥ 102 → SELL at 103
    let outcome = control.run_cycle().await;
    let CycleOutcome::Recorded { trade, transition } = outcome else {
        panic!("expected a recorded SELL, got {outcome:?}");
    };
    assert_eq!(trade.action, TradeAction::Sell);
    assert_eq!(trade.price, 103.0);
    assert!(matches!(
        transition,
        Transition::Close { reason: ExitReason::TakeProfit, entry_price, .. } if entry_price == 100.0
    ));
    assert_eq!(control.position(), PositionState::Flat);

    let history = ledger.recent(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, TradeAction::Sell);
    assert_eq!(history[0].price, 103.0);
    assert_eq!(history[1].action, TradeAction::Buy);
    assert_eq!(history[1].price, 100.0);
    assert!(history[0].id > history[1].id);

    let stats = h.stats.snapshot();
    assert_eq!(stats.cycles, 2);
    assert_eq!(stats.trades_recorded, 2);
}

#[tokio::test]
async fn test_hold_inside_band_writes_nothing() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0, 100.0]),
        ScriptedForecaster::with_predictions(&[101.0, 100.5]),
        true,
    );
    let ledger = memory_ledger();
    let mut control = h.control_loop(ledger.clone());

    assert_eq!(
        control.run_cycle().await,
        CycleOutcome::Hold { position: PositionState::Flat }
    );
    assert_eq!(
        control.run_cycle().await,
        CycleOutcome::Hold { position: PositionState::Flat }
    );
    assert_eq!(ledger.len().await, 0);
}

#[tokio::test]
async fn test_gateway_failure_skips_cycle_and_loop_recovers() {
    let market = ScriptedMarket::new();
    market.push(Err(GatewayError::DataUnavailable("exchange down".into())));
    market.push(Ok(100.0));
    let h = Harness::new(market, ScriptedForecaster::with_predictions(&[102.0]), true);
    let ledger = memory_ledger();
    let mut control = h.control_loop(ledger.clone());

    let outcome = control.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::GatewayFailed(GatewayError::DataUnavailable(_))));
    assert_eq!(control.position(), PositionState::Flat);
    assert_eq!(ledger.len().await, 0);
    assert_eq!(h.forecaster.calls(), 0, "forecaster must not run without bars");

    let outcome = control.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::Recorded { .. }));
    assert_eq!(control.position(), PositionState::Long { entry_price: 100.0 });

    let stats = h.stats.snapshot();
    assert_eq!(stats.gateway_failures, 1);
    assert_eq!(stats.trades_recorded, 1);
}

#[tokio::test]
async fn test_prediction_failure_leaves_open_position() {
    let forecaster = ScriptedForecaster::with_predictions(&[102.0]);
    forecaster.push(Err(GatewayError::PredictionUnavailable("model offline".into())));
    let h = Harness::new(ScriptedMarket::with_closes(&[100.0, 90.0]), forecaster, true);
    let ledger = memory_ledger();
    let mut control = h.control_loop(ledger.clone());

    control.run_cycle().await;
    let outcome = control.run_cycle().await;

    // 90 would have stopped out, but no observation means no decision.
    assert!(matches!(
        outcome,
        CycleOutcome::GatewayFailed(GatewayError::PredictionUnavailable(_))
    ));
    assert_eq!(control.position(), PositionState::Long { entry_price: 100.0 });
    assert_eq!(ledger.len().await, 1);
}

#[tokio::test]
async fn test_paused_loop_makes_no_gateway_calls() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0]),
        ScriptedForecaster::with_predictions(&[102.0]),
        false,
    );
    let ledger = memory_ledger();
    let mut control = h.control_loop(ledger.clone());

    for _ in 0..3 {
        assert_eq!(control.run_cycle().await, CycleOutcome::Paused);
    }
    assert_eq!(h.market.calls(), 0);
    assert_eq!(h.forecaster.calls(), 0);
    assert_eq!(h.stats.snapshot().idle_polls, 3);

    h.run_flag.set(true);
    assert!(matches!(control.run_cycle().await, CycleOutcome::Recorded { .. }));
    assert_eq!(h.market.calls(), 1);
}

#[tokio::test]
async fn test_pause_keeps_position_across_toggle() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0, 97.0]),
        ScriptedForecaster::with_predictions(&[102.0, 97.0]),
        true,
    );
    let ledger = memory_ledger();
    let mut control = h.control_loop(ledger.clone());

    control.run_cycle().await;
    h.run_flag.set(false);
    assert_eq!(control.run_cycle().await, CycleOutcome::Paused);
    assert_eq!(control.position(), PositionState::Long { entry_price: 100.0 });

    h.run_flag.set(true);
    let outcome = control.run_cycle().await;
    assert!(matches!(
        outcome,
        CycleOutcome::Recorded {
            transition: Transition::Close { reason: ExitReason::StopLoss, .. },
            ..
        }
    ));
    assert_eq!(control.position(), PositionState::Flat);
}

#[tokio::test]
async fn test_ledger_failure_keeps_position_change() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0, 103.0]),
        ScriptedForecaster::with_predictions(&[102.0, 100.0]),
        true,
    );
    let ledger = Arc::new(FailingLedger::default());
    let mut events = h.events.subscribe();
    let mut control = h.control_loop(ledger.clone());

    let outcome = control.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::LedgerFailed { transition: Transition::Open { .. }, .. }));
    assert_eq!(control.position(), PositionState::Long { entry_price: 100.0 });

    let event: serde_json::Value = serde_json::from_str(&events.recv().await.unwrap()).unwrap();
    assert_eq!(event["event"], "LEDGER_WRITE_FAILED");
    assert_eq!(event["trade"]["action"], "BUY");

    let outcome = control.run_cycle().await;
    assert!(matches!(outcome, CycleOutcome::LedgerFailed { transition: Transition::Close { .. }, .. }));
    assert_eq!(control.position(), PositionState::Flat);

    assert_eq!(ledger.attempts(), 2);
    assert_eq!(h.stats.snapshot().ledger_failures, 2);
}

#[tokio::test(start_paused = true)]
async fn test_spawned_loop_cycles_and_stops_on_shutdown() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0, 103.0]),
        ScriptedForecaster::with_predictions(&[102.0, 100.0]),
        true,
    );
    let ledger = memory_ledger();
    let (shutdown, rx) = Shutdown::new();
    let handle = h.control_loop(ledger.clone()).spawn(rx);

    // Cycles run at t = 0 and t = 60.
    tokio::time::sleep(Duration::from_secs(90)).await;
    let history = ledger.recent(10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action, TradeAction::Sell);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("loop did not stop")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_spawned_loop_idles_while_paused() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0]),
        ScriptedForecaster::with_predictions(&[102.0]),
        false,
    );
    let ledger = memory_ledger();
    let (shutdown, rx) = Shutdown::new();
    let handle = h.control_loop(ledger.clone()).spawn(rx);

    // Idle polls at t = 0, 10 and 20.
    tokio::time::sleep(Duration::from_secs(25)).await;
    assert_eq!(h.stats.snapshot().idle_polls, 3);
    assert_eq!(h.market.calls(), 0);

    // Picked up at the next idle poll (t = 30).
    h.run_flag.set(true);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(h.market.calls(), 1);
    assert_eq!(ledger.len().await, 1);

    shutdown.trigger();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_toggle_off_stops_gateway_calls_on_running_loop() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0, 100.0, 100.0]),
        ScriptedForecaster::with_predictions(&[100.0, 100.0, 100.0]),
        true,
    );
    let (shutdown, rx) = Shutdown::new();
    let handle = h.control_loop(memory_ledger()).spawn(rx);

    // First cycle at t = 0, then the flag drops mid-sleep.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(h.market.calls(), 1);
    h.run_flag.set(false);

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(h.market.calls(), 1);
    assert!(h.stats.snapshot().idle_polls >= 20);

    shutdown.trigger();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_toggle_and_shutdown_do_not_cut_short_a_started_append() {
    let h = Harness::new(
        ScriptedMarket::with_closes(&[100.0]),
        ScriptedForecaster::with_predictions(&[102.0]),
        true,
    );
    let ledger = Arc::new(SlowLedger::new(Duration::from_secs(5)));
    let (shutdown, rx) = Shutdown::new();
    let handle = h.control_loop(ledger.clone()).spawn(rx);

    // The BUY append is in flight until t = 5.
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(ledger.appends_started(), 1);
    assert_eq!(ledger.inner.len().await, 0);

    h.run_flag.set(false);
    shutdown.trigger();
    handle.await.unwrap();

    let history = ledger.recent(10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].action, TradeAction::Buy);
    assert_eq!(history[0].price, 100.0);
    assert_eq!(h.stats.snapshot().trades_recorded, 1);
    assert_eq!(h.market.calls(), 1);
}
