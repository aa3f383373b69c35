//! Domain models shared across the control loop, the ledger and the
//! control surface.

pub mod bar;
pub mod trade;

pub use bar::Bar;
pub use trade::{NewTradeEvent, TradeAction, TradeEvent};
