pub mod thresholds;

pub use thresholds::{AlarmMatch, Threshold, ThresholdConfig, ThresholdEvaluator, TickOutcome};
