//! Commands for controlling the adaptation scheduler.

use crate::environment::conditions::EnvironmentalConditions;
use serde::{Deserialize, Serialize};

/// Commands sent to the scheduler thread
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SchedulerCommand {
    /// Stop ticking until resumed
    Pause,
    /// Resume periodic ticks
    Resume,
    /// Replace the conditions used by subsequent ticks
    UpdateConditions(EnvironmentalConditions),
    /// Run one tick immediately, even while paused
    TickNow,
    /// Stop the scheduler thread
    Shutdown,
}

/// Current scheduler state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Ticking at the configured interval
    #[default]
    Running,
    /// Thread alive, periodic ticks suspended
    Paused,
    /// Thread has exited
    Stopped,
}
