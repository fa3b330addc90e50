//! Environment module - grow-room conditions, stress, adaptation and epigenetics.

pub mod adaptation;
pub mod conditions;

pub use adaptation::{AdaptationManager, EnvironmentalAdaptation, TickReport};
pub use conditions::{ConditionsBucket, EnvironmentalConditions, StressLevels, Stressor};
