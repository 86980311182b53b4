//! Lineup Runner — search orchestration on top of `lineup-core`.
//!
//! This crate provides:
//! - Optimizer configuration (TOML)
//! - Running sample statistics and Welch's t-test
//! - Result snapshots and JSON checkpoints
//! - Progress tracking with time estimates and a reporting loop
//! - Exhaustive search (fixed games per lineup)
//! - Adaptive search (t-test elimination tournament)

pub mod adaptive;
pub mod checkpoint;
pub mod config;
pub mod exhaustive;
pub mod optimizer;
mod pool;
pub mod progress;
pub mod result;
pub mod stats;

pub use adaptive::AdaptiveOptimizer;
pub use checkpoint::{load_checkpoint, save_checkpoint, Checkpoint, CheckpointError};
pub use config::{AdaptiveConfig, ConfigError, ExhaustiveConfig, Objective, OptimizerConfig};
pub use exhaustive::ExhaustiveOptimizer;
pub use optimizer::{OptimizeError, OptimizeRequest, Optimizer};
pub use progress::{run_with_reporting, ProgressSink, ProgressTracker};
pub use result::{
    histogram_bucket, AdaptiveState, OptimizationResult, OptimizerKind, ResultStatus,
    ScoredLineup, SCHEMA_VERSION,
};
pub use stats::{welch_t_test, MeanShift, SampleStats, TTestResult};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn optimizers_are_send_sync() {
        assert_send::<ExhaustiveOptimizer>();
        assert_sync::<ExhaustiveOptimizer>();
        assert_send::<AdaptiveOptimizer>();
        assert_sync::<AdaptiveOptimizer>();
    }

    #[test]
    fn tracker_is_sync() {
        assert_sync::<ProgressTracker>();
    }

    #[test]
    fn results_and_errors_are_send() {
        assert_send::<OptimizationResult>();
        assert_sync::<OptimizationResult>();
        assert_send::<OptimizeError>();
        assert_send::<OptimizeRequest>();
        assert_sync::<OptimizeRequest>();
    }
}
