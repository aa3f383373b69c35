//! # ledger
//!
//! **Ledger Store**: append-only durable log of trade events.
//!
//! | Backend        | Selected when                                | Durability          |
//! |----------------|----------------------------------------------|---------------------|
//! | `JsonlLedger`  | default (`LEDGER_PATH`, `trades.jsonl`)      | fsync per append    |
//! | `MemoryLedger` | `LEDGER_PATH=memory`                         | process lifetime    |
//! | `PgLedger`     | `DATABASE_URL` set + `--features postgres`   | PostgreSQL commit   |
//!
//! Contract shared by every backend:
//! * `append` assigns a strictly increasing `id` and the write timestamp and
//!   is visible to every later `recent` call once it returns `Ok`.
//! * `recent(limit)` is newest first (timestamp desc, id desc) and returns an
//!   empty `Vec` on an empty ledger.
//! * Only the control loop appends; any number of readers may run
//!   concurrently.

pub mod file;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::{NewTradeEvent, TradeEvent};

pub use file::JsonlLedger;
pub use memory::MemoryLedger;
#[cfg(feature = "postgres")]
pub use postgres::PgLedger;

// ─── Errors ───────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ledger serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored record could not be decoded (not a torn final write).
    #[error("ledger corrupt at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    #[cfg(feature = "postgres")]
    #[error("ledger database error: {0}")]
    Database(#[from] sqlx::Error),
}

// ─── Store Trait ──────────────────────────────────────────────────────────────

#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Persists the decision and returns the stored record (carrying its id).
    async fn append(&self, event: NewTradeEvent) -> Result<TradeEvent, LedgerError>;

    /// Up to `limit` most recent events, newest first.
    async fn recent(&self, limit: usize) -> Result<Vec<TradeEvent>, LedgerError>;
}

pub type SharedLedger = Arc<dyn LedgerStore>;

// ─── Backend Selection ────────────────────────────────────────────────────────

/// Opens the backend selected by configuration.
pub async fn open(config: &Config) -> anyhow::Result<SharedLedger> {
    #[cfg(feature = "postgres")]
    if let Some(url) = &config.database_url {
        let ledger = PgLedger::connect(url)
            .await
            .context("Failed to open PostgreSQL ledger")?;
        return Ok(Arc::new(ledger));
    }

    #[cfg(not(feature = "postgres"))]
    if config.database_url.is_some() {
        tracing::warn!("DATABASE_URL is set but the postgres feature is off; using the file ledger");
    }

    if config.ledger_path.as_os_str() == "memory" {
        info!("📒 Ledger: in-memory (not durable)");
        return Ok(Arc::new(MemoryLedger::new()));
    }

    let ledger = JsonlLedger::open(&config.ledger_path)
        .await
        .with_context(|| format!("Failed to open ledger at {}", config.ledger_path.display()))?;
    info!(path = %config.ledger_path.display(), events = ledger.len().await, "📒 Ledger opened");
    Ok(Arc::new(ledger))
}

/// Write time for the next record: now, but never earlier than the previous
/// record, so id order and timestamp order agree.
pub(crate) fn next_timestamp(
    last: Option<chrono::DateTime<chrono::Utc>>,
) -> chrono::DateTime<chrono::Utc> {
    let now = chrono::Utc::now();
    match last {
        Some(prev) if prev > now => prev,
        _ => now,
    }
}
