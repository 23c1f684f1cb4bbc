//! Service layer
//!
//! Business logic of both flows. Services only see the collaborator traits
//! and a [`MessageSink`](crate::sink::MessageSink), which are handed in by
//! the command handlers.

mod aggregator;
mod command;
mod decision;
mod gate;
mod trigger;
mod waiter;

pub use aggregator::{AggregationSummary, StatusAggregator};
pub use gate::{GateOutcome, run_gate};
pub use waiter::WaitOutcome;
