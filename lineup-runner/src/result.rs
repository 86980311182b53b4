//! The optimization result: the unit of progress reporting and checkpointing.
//!
//! A result is an immutable value. Optimizers derive each new snapshot from
//! the previous one with the `with_*` builders rather than mutating a shared
//! instance.

use std::collections::{BTreeMap, BTreeSet};

use lineup_core::Lineup;
use serde::{Deserialize, Serialize};

use crate::stats::SampleStats;

/// Bumped whenever the serialized layout changes incompatibly.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultStatus {
    #[default]
    NotStarted,
    InProgress,
    Paused,
    Complete,
    Error,
    Estimate,
}

impl ResultStatus {
    /// A terminal result is never followed by another snapshot of the same run.
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResultStatus::NotStarted | ResultStatus::InProgress)
    }
}

/// Which search produced a result. Checkpoints are only resumable by the
/// same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerKind {
    Exhaustive,
    Adaptive,
}

impl std::fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OptimizerKind::Exhaustive => f.write_str("exhaustive"),
            OptimizerKind::Adaptive => f.write_str("adaptive"),
        }
    }
}

/// A lineup together with its rank and mean runs per game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredLineup {
    pub rank: u64,
    pub lineup: Lineup,
    pub score: f64,
}

/// Tournament state needed to resume an adaptive search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveState {
    /// Ranks drawn but not yet eliminated, champion included.
    pub candidate_ranks: BTreeSet<u64>,
    /// Next rank that has never been drawn.
    pub next_rank: u64,
    pub champion_rank: u64,
    /// Samples accumulated by the champion so far.
    pub champion_stats: SampleStats,
    pub simulations_run: u64,
    /// Comparisons decided by mean after both sides hit the sample cap.
    pub comparisons_at_cap: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub optimizer: OptimizerKind,
    pub best: Option<ScoredLineup>,
    pub worst: Option<ScoredLineup>,
    pub count_total: u64,
    pub count_completed: u64,
    pub elapsed_ms: u64,
    /// Score bucket (tenths of a run) → number of lineups.
    #[serde(default)]
    pub histogram: BTreeMap<i64, u64>,
    pub status: ResultStatus,
    #[serde(default)]
    pub status_message: Option<String>,
    #[serde(default)]
    pub estimated_time_remaining_ms: Option<u64>,
    #[serde(default)]
    pub estimated_total_ms: Option<u64>,
    #[serde(default)]
    pub adaptive: Option<AdaptiveState>,
}

/// Histogram bucket for a mean score, at one-decimal resolution.
pub fn histogram_bucket(score: f64) -> i64 {
    (score * 10.0) as i64
}

impl OptimizationResult {
    /// An empty result for a search over `count_total` candidates.
    pub fn new(optimizer: OptimizerKind, count_total: u64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            optimizer,
            best: None,
            worst: None,
            count_total,
            count_completed: 0,
            elapsed_ms: 0,
            histogram: BTreeMap::new(),
            status: ResultStatus::NotStarted,
            status_message: None,
            estimated_time_remaining_ms: None,
            estimated_total_ms: None,
            adaptive: None,
        }
    }

    pub fn with_status(mut self, status: ResultStatus, message: Option<String>) -> Self {
        self.status = status;
        self.status_message = message;
        self
    }

    pub fn with_progress(mut self, count_completed: u64, elapsed_ms: u64) -> Self {
        self.count_completed = count_completed;
        self.elapsed_ms = elapsed_ms;
        self
    }

    pub fn with_estimates(mut self, remaining_ms: Option<u64>, total_ms: Option<u64>) -> Self {
        self.estimated_time_remaining_ms = remaining_ms;
        self.estimated_total_ms = total_ms;
        self
    }

    pub fn with_best(mut self, best: Option<ScoredLineup>) -> Self {
        self.best = best;
        self
    }

    pub fn with_worst(mut self, worst: Option<ScoredLineup>) -> Self {
        self.worst = worst;
        self
    }

    pub fn with_histogram(mut self, histogram: BTreeMap<i64, u64>) -> Self {
        self.histogram = histogram;
        self
    }

    pub fn with_adaptive(mut self, adaptive: Option<AdaptiveState>) -> Self {
        self.adaptive = adaptive;
        self
    }

    pub fn histogram_total(&self) -> u64 {
        self.histogram.values().sum()
    }

    pub fn remaining(&self) -> u64 {
        self.count_total.saturating_sub(self.count_completed)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lineup_core::PlayerId;

    fn sample() -> OptimizationResult {
        let lineup = Lineup::ordered(vec![PlayerId::new("a"), PlayerId::new("b")]);
        let mut histogram = BTreeMap::new();
        histogram.insert(31, 2);
        histogram.insert(-1, 1);
        OptimizationResult::new(OptimizerKind::Exhaustive, 2)
            .with_best(Some(ScoredLineup {
                rank: 1,
                lineup,
                score: 3.14,
            }))
            .with_histogram(histogram)
            .with_progress(2, 1500)
            .with_status(ResultStatus::Complete, None)
    }

    #[test]
    fn terminal_statuses() {
        assert!(!ResultStatus::NotStarted.is_terminal());
        assert!(!ResultStatus::InProgress.is_terminal());
        assert!(ResultStatus::Paused.is_terminal());
        assert!(ResultStatus::Complete.is_terminal());
        assert!(ResultStatus::Error.is_terminal());
        assert!(ResultStatus::Estimate.is_terminal());
    }

    #[test]
    fn buckets_at_one_decimal() {
        assert_eq!(histogram_bucket(3.14), 31);
        assert_eq!(histogram_bucket(3.19), 31);
        assert_eq!(histogram_bucket(0.0), 0);
        assert_eq!(histogram_bucket(70.0), 700);
    }

    #[test]
    fn builders_leave_the_source_untouched() {
        let base = sample();
        let paused = base.clone().with_status(ResultStatus::Paused, Some("halt".into()));
        assert_eq!(base.status, ResultStatus::Complete);
        assert_eq!(paused.status, ResultStatus::Paused);
        assert_eq!(paused.histogram, base.histogram);
    }

    #[test]
    fn json_round_trip_keeps_histogram_keys() {
        let result = sample();
        let json = serde_json::to_string(&result).unwrap();
        let back: OptimizationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
        assert_eq!(back.histogram_total(), 3);
    }

    #[test]
    fn missing_optional_fields_default() {
        let json = r#"{
            "optimizer": "adaptive",
            "best": null,
            "worst": null,
            "count_total": 10,
            "count_completed": 4,
            "elapsed_ms": 0,
            "status": "PAUSED"
        }"#;
        let result: OptimizationResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.schema_version, SCHEMA_VERSION);
        assert!(result.histogram.is_empty());
        assert!(result.adaptive.is_none());
        assert_eq!(result.remaining(), 6);
    }
}
