//! # ledger::memory
//!
//! Process-lifetime ledger.  Used by tests and `LEDGER_PATH=memory`.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{next_timestamp, LedgerError, LedgerStore};
use crate::models::{NewTradeEvent, TradeEvent};

#[derive(Debug, Default)]
pub struct MemoryLedger {
    events: RwLock<Vec<TradeEvent>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    async fn append(&self, event: NewTradeEvent) -> Result<TradeEvent, LedgerError> {
        let mut events = self.events.write().await;
        let id = events.last().map(|e| e.id + 1).unwrap_or(1);
        let stored = event.into_event(id, next_timestamp(events.last().map(|e| e.timestamp)));
        events.push(stored.clone());
        Ok(stored)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TradeEvent>, LedgerError> {
        let events = self.events.read().await;
        Ok(events.iter().rev().take(limit).cloned().collect())
    }
}
