//! # ledger::file
//!
//! JSON-lines ledger: one `TradeEvent` object per line, appended and
//! `fsync`ed before `append` returns.
//!
//! ## Recovery on open
//! ```text
//! replay every line ──▶ rebuild in-memory index + next id
//!   ├─ final chunk without '\n' → torn write from a crash: truncate it
//!   └─ unparsable complete line → LedgerError::Corrupt
//! ```
//! A failed append truncates the file back to its previous length, so a
//! record is either fully present or absent.  If that truncate fails as
//! well, later appends retry it first and are refused until it succeeds.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use super::{next_timestamp, LedgerError, LedgerStore};
use crate::models::{NewTradeEvent, TradeEvent};

// ─── Record Sink ──────────────────────────────────────────────────────────────

/// The two file operations an append needs.
#[async_trait]
trait RecordSink: Send + Sync {
    /// Writes and syncs one record.
    async fn write_record(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Cuts the file back to `len` bytes and syncs.
    async fn truncate(&mut self, len: u64) -> io::Result<()>;
}

#[async_trait]
impl RecordSink for File {
    async fn write_record(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes).await?;
        self.flush().await?;
        self.sync_data().await
    }

    async fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len).await?;
        self.sync_data().await
    }
}

// ─── Ledger ───────────────────────────────────────────────────────────────────

pub struct JsonlLedger {
    path:  PathBuf,
    inner: RwLock<Inner>,
}

struct Inner {
    sink:   Box<dyn RecordSink>,
    /// Bytes of valid records on disk.
    len:    u64,
    /// A rollback failed: bytes past `len` may be on disk.  No append is
    /// accepted until a truncate to `len` succeeds.
    dirty:  bool,
    /// Every record, oldest first.
    events: Vec<TradeEvent>,
}

impl JsonlLedger {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, LedgerError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;

        let content = tokio::fs::read(&path).await?;
        let (mut events, valid_len) = replay(&content)?;

        if valid_len < content.len() as u64 {
            warn!(
                path = %path.display(),
                dropped_bytes = content.len() as u64 - valid_len,
                "Ledger ends with a torn record, truncating"
            );
            file.truncate(valid_len).await?;
        }

        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));

        Ok(Self {
            path,
            inner: RwLock::new(Inner {
                sink: Box::new(file),
                len: valid_len,
                dirty: false,
                events,
            }),
        })
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.events.len()
    }
}

/// Parses the file body.  Returns the records and the byte length that holds
/// complete records.
fn replay(content: &[u8]) -> Result<(Vec<TradeEvent>, u64), LedgerError> {
    let mut events = Vec::new();
    let mut offset = 0u64;

    for (idx, raw) in content.split_inclusive(|b| *b == b'\n').enumerate() {
        // Only the final chunk can lack its newline: that append never
        // completed, so it and everything after it is discarded.
        let Some(body) = raw.strip_suffix(b"\n") else {
            break;
        };

        if !body.iter().all(u8::is_ascii_whitespace) {
            let event = serde_json::from_slice::<TradeEvent>(body).map_err(|e| {
                LedgerError::Corrupt { line: idx + 1, reason: e.to_string() }
            })?;
            events.push(event);
        }
        offset += raw.len() as u64;
    }

    Ok((events, offset))
}

#[async_trait]
impl LedgerStore for JsonlLedger {
    async fn append(&self, event: NewTradeEvent) -> Result<TradeEvent, LedgerError> {
        let mut inner = self.inner.write().await;
        let inner = &mut *inner;

        if inner.dirty {
            if let Err(e) = inner.sink.truncate(inner.len).await {
                error!(error = %e, path = %self.path.display(), "Ledger still holds a torn record, append refused");
                return Err(e.into());
            }
            inner.dirty = false;
            warn!(path = %self.path.display(), len = inner.len, "Ledger torn record removed");
        }

        let id = inner.events.iter().map(|e| e.id).max().unwrap_or(0) + 1;
        let stored = event.into_event(id, next_timestamp(inner.events.last().map(|e| e.timestamp)));

        let mut line = serde_json::to_vec(&stored)?;
        line.push(b'\n');

        if let Err(e) = inner.sink.write_record(&line).await {
            error!(error = %e, path = %self.path.display(), "Ledger write failed, rolling back");
            if let Err(trunc) = inner.sink.truncate(inner.len).await {
                error!(error = %trunc, "Ledger rollback truncate failed");
                inner.dirty = true;
            }
            return Err(e.into());
        }

        inner.len += line.len() as u64;
        inner.events.push(stored.clone());
        debug!(id, path = %self.path.display(), "Ledger append durable");

        Ok(stored)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<TradeEvent>, LedgerError> {
        let inner = self.inner.read().await;
        Ok(inner.events.iter().rev().take(limit).cloned().collect())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
