//! # Autopilot - forecast-driven position management
//!
//! ```text
//!                        ┌──────────────────────────────┐
//!   Binance klines ────▶ │ Gateway (fetch + forecast)   │ ◀── timeout cap
//!   model service  ────▶ └──────────────┬───────────────┘
//!                                       │ Observation
//!                  RunFlag ──▶ ┌────────▼────────┐   append   ┌──────────────┐
//!                     ▲        │  ControlLoop    │ ─────────▶ │ LedgerStore  │
//!                     │        │  PositionMachine│            └──────▲───────┘
//!                     │        └────────┬────────┘                   │ recent
//!                     │                 │ WsEvent                    │
//!   ┌─────────────────┴─────────────────▼────────────────────────────┴──────┐
//!   │ ControlSurface - POST /api/control/toggle · POST /api/predict ·       │
//!   │                  GET /api/trades · GET /ws/monitor                    │
//!   └───────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod events;
pub mod gateway;
pub mod indicators;
pub mod ledger;
pub mod models;
pub mod routes;
pub mod state;
pub mod surface;
