//! # control
//!
//! Runtime control cells shared between the control loop and the control
//! surface.
//!
//! ```text
//!  POST /api/control/toggle ──▶ RunFlag::set ─┐
//!                                             ▼
//!                               AtomicBool (SeqCst)
//!                                             │
//!  ControlLoop (every wake-up) ◀─ is_enabled ─┘
//! ```
//!
//! The flag is the only state both sides touch.  It is read once at the
//! start of a cycle; a toggle during an in-flight cycle is seen on the next
//! wake-up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

// ─── RunFlag ──────────────────────────────────────────────────────────────────

/// Process-wide run/pause switch.  Cheap to clone; all clones share one cell.
#[derive(Debug, Clone, Default)]
pub struct RunFlag {
    inner: Arc<AtomicBool>,
}

impl RunFlag {
    pub fn new(enabled: bool) -> Self {
        Self { inner: Arc::new(AtomicBool::new(enabled)) }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    /// Sets the flag and returns its previous value.  Idempotent.
    pub fn set(&self, enabled: bool) -> bool {
        self.inner.swap(enabled, Ordering::SeqCst)
    }
}

// ─── Shutdown ─────────────────────────────────────────────────────────────────

/// Sending half of the process shutdown signal, held by the composition root.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> (Self, watch::Receiver<bool>) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, rx)
    }

    pub fn trigger(&self) {
        // Err only when every receiver is gone; nothing left to stop.
        let _ = self.tx.send(true);
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
