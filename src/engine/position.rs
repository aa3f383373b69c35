//! # engine::position
//!
//! **Position State Machine**: FLAT ⇄ LONG
//!
//! ```text
//!            predicted > current × (1 + entry_margin)
//!   ┌──────┐ ─────────────────────────────────────────▶ ┌──────────────────┐
//!   │ FLAT │          BUY @ current                     │ LONG(entry_price)│
//!   └──────┘ ◀───────────────────────────────────────── └──────────────────┘
//!            current ≤ entry × (1 − stop_loss_margin)
//!         or current ≥ entry × (1 + take_profit_margin)
//!                     SELL @ current
//! ```
//!
//! Exit levels are measured from the entry price recorded when the position
//! opened, never from the current cycle's price.  At most one transition per
//! evaluation.

use serde::Serialize;

use crate::models::{NewTradeEvent, TradeAction};

// ─── Thresholds ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Forecast edge over the current price required to open.
    pub entry_margin:       f64,
    /// Fractional drawdown from entry that closes the position.
    pub stop_loss_margin:   f64,
    /// Fractional gain from entry that closes the position.
    pub take_profit_margin: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            entry_margin:       0.01,
            stop_loss_margin:   0.02,
            take_profit_margin: 0.02,
        }
    }
}

impl Thresholds {
    #[inline]
    pub fn entry_level(&self, current_price: f64) -> f64 {
        current_price * (1.0 + self.entry_margin)
    }

    #[inline]
    pub fn stop_loss_level(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 - self.stop_loss_margin)
    }

    #[inline]
    pub fn take_profit_level(&self, entry_price: f64) -> f64 {
        entry_price * (1.0 + self.take_profit_margin)
    }
}

// ─── PositionState ────────────────────────────────────────────────────────────

/// `entry_price` only exists while LONG, so "entry price set ⇔ open" holds
/// by construction.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionState {
    #[default]
    Flat,
    Long { entry_price: f64 },
}

impl PositionState {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionState::Long { .. })
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            PositionState::Flat => None,
            PositionState::Long { entry_price } => Some(*entry_price),
        }
    }
}

// ─── Transition ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExitReason {
    StopLoss,
    TakeProfit,
}

/// What one evaluation decided.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// FLAT → LONG
    Open { price: f64 },
    /// LONG → FLAT
    Close { price: f64, entry_price: f64, reason: ExitReason },
}

impl Transition {
    pub fn action(&self) -> TradeAction {
        match self {
            Transition::Open { .. }  => TradeAction::Buy,
            Transition::Close { .. } => TradeAction::Sell,
        }
    }

    pub fn price(&self) -> f64 {
        match self {
            Transition::Open { price } | Transition::Close { price, .. } => *price,
        }
    }

    pub fn to_event(&self, pair: &str) -> NewTradeEvent {
        NewTradeEvent::new(pair, self.action(), self.price())
    }
}

// ─── Machine ──────────────────────────────────────────────────────────────────

/// Owned exclusively by the control loop; never shared.
#[derive(Debug, Clone, Default)]
pub struct PositionMachine {
    state:      PositionState,
    thresholds: Thresholds,
}

impl PositionMachine {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { state: PositionState::Flat, thresholds }
    }

    pub fn state(&self) -> PositionState {
        self.state
    }

    /// Pure guard evaluation.  Does not change state.
    pub fn evaluate(&self, current_price: f64, predicted_price: f64) -> Option<Transition> {
        match self.state {
            PositionState::Flat => {
                if predicted_price > self.thresholds.entry_level(current_price) {
                    Some(Transition::Open { price: current_price })
                } else {
                    None
                }
            }
            PositionState::Long { entry_price } => {
                let reason = if current_price <= self.thresholds.stop_loss_level(entry_price) {
                    ExitReason::StopLoss
                } else if current_price >= self.thresholds.take_profit_level(entry_price) {
                    ExitReason::TakeProfit
                } else {
                    return None;
                };
                Some(Transition::Close { price: current_price, entry_price, reason })
            }
        }
    }

    /// Evaluates and applies in one step.  Returns the transition that fired.
    pub fn step(&mut self, current_price: f64, predicted_price: f64) -> Option<Transition> {
        let transition = self.evaluate(current_price, predicted_price)?;
        self.state = match transition {
            Transition::Open { price }  => PositionState::Long { entry_price: price },
            Transition::Close { .. }    => PositionState::Flat,
        };
        Some(transition)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
