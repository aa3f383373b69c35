//! # state
//!
//! Shared state injected into every Axum handler.  Handlers only ever see
//! the control surface; the position lives inside the loop task.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::surface::ControlSurface;

#[derive(Clone)]
pub struct AppState {
    /// Toggle / forecast / ledger operations
    pub control:    ControlSurface,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(control: ControlSurface) -> Self {
        Self { control, started_at: Utc::now() }
    }
}

/// Convenience type alias
pub type SharedState = Arc<AppState>;

pub fn build_state(control: ControlSurface) -> SharedState {
    Arc::new(AppState::new(control))
}
