//! Optimizer configuration, loadable from TOML.
//!
//! ```toml
//! innings = 7
//! threads = 8
//! objective = "highest"
//!
//! [exhaustive]
//! games = 10000
//!
//! [adaptive]
//! alpha = 0.001
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Whether the search looks for the lineup scoring the most or the fewest runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    #[default]
    Highest,
    Lowest,
}

impl Objective {
    /// True when `candidate` should replace `incumbent`.
    pub fn prefers(self, candidate: f64, incumbent: f64) -> bool {
        match self {
            Objective::Highest => candidate > incumbent,
            Objective::Lowest => candidate < incumbent,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Innings per simulated game.
    pub innings: u32,
    /// Worker threads.
    pub threads: usize,
    pub objective: Objective,
    /// Master seed for the deterministic RNG hierarchy.
    pub master_seed: u64,
    /// Interval between progress reports, see [`OptimizerConfig::progress_interval`].
    pub progress_interval_ms: u64,
    pub exhaustive: ExhaustiveConfig,
    pub adaptive: AdaptiveConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExhaustiveConfig {
    /// Games simulated per candidate lineup.
    pub games: u64,
    /// Maximum tasks in flight.
    pub task_buffer: usize,
    /// Lineups timed by an estimate-only run.
    pub estimate_sample_lineups: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdaptiveConfig {
    /// Significance level for declaring one lineup better than another.
    pub alpha: f64,
    /// Games simulated for a lineup before its first comparison.
    pub warmup_games: u64,
    /// Games added to the smaller sample when a comparison is inconclusive.
    pub sample_chunk: u64,
    /// Per-lineup sample cap; a comparison still inconclusive when both sides
    /// reach it is decided by mean.
    pub max_samples_per_lineup: u64,
    /// Largest number of challengers handed to one task.
    pub max_lineups_per_task: usize,
    /// Maximum tasks in flight.
    pub task_buffer: usize,
    /// Minimum samples behind the reported final score.
    pub final_top_up_samples: u64,
    /// Random lineup pairs timed by an estimate-only run.
    pub estimate_sample_pairs: u64,
    /// Random lineups whose mean scores measure how far apart lineups are,
    /// for an estimate-only run.
    pub estimate_spread_lineups: u64,
    /// Games behind each of those mean scores.
    pub estimate_spread_games: u64,
    /// Estimate comparisons only resolve means closer than this many
    /// standard deviations of the lineup spread. Higher is faster and
    /// less representative.
    pub estimate_std_deviations: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            innings: 7,
            threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            objective: Objective::Highest,
            master_seed: 42,
            progress_interval_ms: 5000,
            exhaustive: ExhaustiveConfig::default(),
            adaptive: AdaptiveConfig::default(),
        }
    }
}

impl Default for ExhaustiveConfig {
    fn default() -> Self {
        Self {
            games: 10_000,
            task_buffer: 1000,
            estimate_sample_lineups: 100,
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            alpha: 0.001,
            warmup_games: 10,
            sample_chunk: 10,
            max_samples_per_lineup: 1_000_000,
            max_lineups_per_task: 2,
            task_buffer: 20_000,
            final_top_up_samples: 10_000,
            estimate_sample_pairs: 100,
            estimate_spread_lineups: 100,
            estimate_spread_games: 100,
            estimate_std_deviations: 0.8,
        }
    }
}

impl OptimizerConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// How often a reporting loop hands snapshots to its sink.
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.innings == 0 {
            return Err(ConfigError::Invalid("innings must be at least 1".into()));
        }
        if self.threads == 0 {
            return Err(ConfigError::Invalid("threads must be at least 1".into()));
        }
        if self.progress_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "progress_interval_ms must be at least 1".into(),
            ));
        }
        if self.exhaustive.games == 0 {
            return Err(ConfigError::Invalid("exhaustive.games must be at least 1".into()));
        }
        if self.exhaustive.task_buffer == 0 || self.adaptive.task_buffer == 0 {
            return Err(ConfigError::Invalid("task_buffer must be at least 1".into()));
        }
        let a = &self.adaptive;
        if !(a.alpha > 0.0 && a.alpha < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "adaptive.alpha must be in (0, 1), got {}",
                a.alpha
            )));
        }
        if a.warmup_games < 2 {
            return Err(ConfigError::Invalid(
                "adaptive.warmup_games must be at least 2 for a t-test".into(),
            ));
        }
        if a.sample_chunk == 0 {
            return Err(ConfigError::Invalid("adaptive.sample_chunk must be at least 1".into()));
        }
        if a.max_samples_per_lineup < a.warmup_games {
            return Err(ConfigError::Invalid(
                "adaptive.max_samples_per_lineup must not be below warmup_games".into(),
            ));
        }
        if a.max_lineups_per_task == 0 {
            return Err(ConfigError::Invalid(
                "adaptive.max_lineups_per_task must be at least 1".into(),
            ));
        }
        if a.estimate_spread_lineups < 2 || a.estimate_spread_games == 0 {
            return Err(ConfigError::Invalid(
                "adaptive estimate spread needs at least 2 lineups of 1 game".into(),
            ));
        }
        if !(a.estimate_std_deviations.is_finite() && a.estimate_std_deviations > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "adaptive.estimate_std_deviations must be positive, got {}",
                a.estimate_std_deviations
            )));
        }
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = OptimizerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.innings, 7);
        assert_eq!(config.exhaustive.games, 10_000);
        assert_eq!(config.adaptive.warmup_games, 10);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = OptimizerConfig::from_toml_str(
            r#"
            innings = 9
            objective = "lowest"

            [adaptive]
            alpha = 0.05
            "#,
        )
        .unwrap();
        assert_eq!(config.innings, 9);
        assert_eq!(config.objective, Objective::Lowest);
        assert!((config.adaptive.alpha - 0.05).abs() < 1e-12);
        assert_eq!(config.adaptive.sample_chunk, 10);
        assert_eq!(config.exhaustive.games, 10_000);
    }

    #[test]
    fn rejects_bad_alpha() {
        let err = OptimizerConfig::from_toml_str("[adaptive]\nalpha = 1.5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn progress_interval_follows_the_setting() {
        assert_eq!(
            OptimizerConfig::default().progress_interval(),
            Duration::from_secs(5)
        );
        let config = OptimizerConfig::from_toml_str("progress_interval_ms = 250\n").unwrap();
        assert_eq!(config.progress_interval(), Duration::from_millis(250));
        assert!(OptimizerConfig::from_toml_str("progress_interval_ms = 0\n").is_err());
    }

    #[test]
    fn rejects_zero_innings() {
        assert!(OptimizerConfig::from_toml_str("innings = 0\n").is_err());
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = OptimizerConfig::from_toml_str("innings = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn objective_preference() {
        assert!(Objective::Highest.prefers(5.0, 4.0));
        assert!(!Objective::Highest.prefers(4.0, 4.0));
        assert!(Objective::Lowest.prefers(3.0, 4.0));
    }

    #[test]
    fn round_trips_through_toml() {
        let config = OptimizerConfig::default();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(OptimizerConfig::from_toml_str(&text).unwrap(), config);
    }
}
