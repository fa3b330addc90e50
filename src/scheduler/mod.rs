//! Cancellable periodic adaptation ticks over a shared engine.

pub mod commands;
pub mod tick_thread;

pub use commands::{SchedulerCommand, SchedulerState};
pub use tick_thread::AdaptationScheduler;
