//! # events
//!
//! Defines [`WsEvent`]: every event the control loop and the control
//! surface broadcast to `/ws/monitor` subscribers.
//!
//! Events travel over a `tokio::sync::broadcast::Sender<String>` as
//! pre-serialized JSON so slow WebSocket clients never hold up the loop.

use serde::Serialize;
use tokio::sync::broadcast;

use crate::engine::position::ExitReason;
use crate::models::{NewTradeEvent, TradeEvent};

/// Real-time events for monitoring clients.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WsEvent {
    /// A decision was durably appended to the ledger.
    TradeRecorded {
        trade:       TradeEvent,
        /// Set on SELL: which exit guard fired.
        exit_reason: Option<ExitReason>,
    },

    /// A decision was made but the ledger append failed.  The in-memory
    /// position already moved.
    LedgerWriteFailed {
        trade: NewTradeEvent,
        error: String,
    },

    /// A cycle was skipped because the gateway failed.
    CycleFailed {
        pair:  String,
        kind:  &'static str,
        error: String,
    },

    /// The run flag changed through the control surface.
    LoopToggled {
        running: bool,
    },
}

impl WsEvent {
    /// Serialises for the WebSocket wire.
    #[inline]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|_| r#"{"event":"SERIALIZATION_ERROR"}"#.to_string())
    }
}

// ─── EventBus ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<String>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Never fails: having no subscriber is normal in headless mode.
    pub fn publish(&self, event: &WsEvent) {
        let _ = self.tx.send(event.to_json());
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
