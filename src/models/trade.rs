//! # models::trade
//!
//! Ledger records.
//!
//! `NewTradeEvent` = what the state machine decided (pair, action, price)
//! `TradeEvent`    = the same decision after the ledger stamped it with an
//!                   `id` and a UTC `timestamp`. Never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── TradeAction ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeAction::Buy  => "BUY",
            TradeAction::Sell => "SELL",
        }
    }
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TradeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY"  => Ok(TradeAction::Buy),
            "SELL" => Ok(TradeAction::Sell),
            other  => Err(format!("unknown trade action '{other}'")),
        }
    }
}

// ─── NewTradeEvent ────────────────────────────────────────────────────────────

/// A decision waiting to be appended to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTradeEvent {
    pub pair:   String,
    pub action: TradeAction,
    pub price:  f64,
}

impl NewTradeEvent {
    pub fn new(pair: impl Into<String>, action: TradeAction, price: f64) -> Self {
        Self { pair: pair.into(), action, price }
    }

    /// Stamps the decision with the ledger-assigned id and time.
    pub fn into_event(self, id: i64, timestamp: DateTime<Utc>) -> TradeEvent {
        TradeEvent {
            id,
            pair:      self.pair,
            action:    self.action,
            price:     self.price,
            timestamp,
        }
    }
}

// ─── TradeEvent ───────────────────────────────────────────────────────────────

/// Immutable ledger record `{id, pair, action, price, timestamp}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Strictly increasing, assigned by the store.
    pub id:        i64,
    pub pair:      String,
    pub action:    TradeAction,
    pub price:     f64,
    /// Write time (UTC), assigned by the store.
    pub timestamp: DateTime<Utc>,
}
