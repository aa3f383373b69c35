//! Decision engine: the position state machine and the loop that drives it.

pub mod position;
pub mod scheduler;
pub mod stats;

pub use position::{ExitReason, PositionMachine, PositionState, Thresholds, Transition};
pub use scheduler::{ControlLoop, CycleOutcome, LoopConfig};
pub use stats::{LoopStats, StatsSnapshot};
