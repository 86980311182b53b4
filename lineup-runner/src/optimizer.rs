//! The optimizer surface shared by the exhaustive and adaptive searches.

use lineup_core::{
    IndexerError, LineupIndexer, LineupKind, Player, PlayerId, Roster, RosterError,
    SimulationError,
};
use thiserror::Error;

use crate::config::ConfigError;
use crate::progress::ProgressTracker;
use crate::result::{OptimizationResult, OptimizerKind};

#[derive(Debug, Error)]
pub enum OptimizeError {
    #[error("Can not optimize lineup because player {name} ({id}) has no plate appearances")]
    NoPlateAppearances { name: String, id: PlayerId },
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Indexer(#[from] IndexerError),
    #[error(transparent)]
    Simulation(#[from] SimulationError),
    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("checkpoint cannot be resumed: {0}")]
    IncompatibleCheckpoint(String),
    #[error("rank {rank} is outside the lineup space of size {size}")]
    MissingLineup { rank: u64, size: u64 },
    #[error("worker task failed: {0}")]
    Worker(String),
}

/// What to search: a roster, the subset of players to arrange, and the
/// structural rule every lineup must satisfy.
#[derive(Debug, Clone)]
pub struct OptimizeRequest {
    pub roster: Roster,
    pub players: Vec<PlayerId>,
    pub kind: LineupKind,
}

impl OptimizeRequest {
    pub fn new(roster: Roster, players: Vec<PlayerId>, kind: LineupKind) -> Self {
        Self {
            roster,
            players,
            kind,
        }
    }

    /// Every roster player, in roster order.
    pub fn whole_roster(roster: Roster, kind: LineupKind) -> Self {
        let players = roster.ids();
        Self::new(roster, players, kind)
    }

    /// Resolve the selected players, failing on unknown ids or on any
    /// player without a plate appearance.
    pub fn validate(&self) -> Result<Vec<Player>, OptimizeError> {
        let players = self.roster.select(&self.players)?;
        if let Some(p) = players
            .iter()
            .find(|p| p.outcomes.plate_appearances() == 0)
        {
            return Err(OptimizeError::NoPlateAppearances {
                name: p.name.clone(),
                id: p.id.clone(),
            });
        }
        Ok(players)
    }

    pub(crate) fn build_indexer(
        &self,
        players: &[PlayerId],
    ) -> Result<Box<dyn LineupIndexer>, OptimizeError> {
        Ok(self.kind.build(&self.roster, players)?)
    }
}

pub trait Optimizer {
    fn kind(&self) -> OptimizerKind;

    /// Run the search to completion or until `tracker` receives a pause
    /// request. `existing` resumes from a previous paused result.
    fn optimize(
        &self,
        request: &OptimizeRequest,
        tracker: &ProgressTracker,
        existing: Option<&OptimizationResult>,
    ) -> Result<OptimizationResult, OptimizeError>;

    /// Time a small sample of work and project the full run.
    fn estimate(
        &self,
        request: &OptimizeRequest,
        existing: Option<&OptimizationResult>,
    ) -> Result<OptimizationResult, OptimizeError>;
}

/// Reject a checkpoint from another optimizer or another candidate space.
pub(crate) fn check_resumable(
    existing: &OptimizationResult,
    kind: OptimizerKind,
    size: u64,
) -> Result<(), OptimizeError> {
    if existing.optimizer != kind {
        return Err(OptimizeError::IncompatibleCheckpoint(format!(
            "checkpoint was written by the {} optimizer, not {kind}",
            existing.optimizer
        )));
    }
    if existing.count_total != size {
        return Err(OptimizeError::IncompatibleCheckpoint(format!(
            "checkpoint covers {} lineups but this search has {size}",
            existing.count_total
        )));
    }
    if existing.count_completed > size {
        return Err(OptimizeError::IncompatibleCheckpoint(format!(
            "checkpoint claims {} of {size} lineups completed",
            existing.count_completed
        )));
    }
    Ok(())
}

/// Projected remaining time at `per_ms` units of work per millisecond.
pub(crate) fn project_remaining_ms(remaining: u64, per_ms: f64) -> Option<u64> {
    if per_ms > 0.0 && per_ms.is_finite() {
        Some((remaining as f64 / per_ms).ceil() as u64)
    } else {
        None
    }
}

// ─── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use lineup_core::{Gender, OutcomeCounts};

    fn player(id: &str, outs: u32, singles: u32) -> Player {
        Player::new(
            id,
            id.to_uppercase(),
            Gender::Male,
            OutcomeCounts {
                outs,
                singles,
                ..OutcomeCounts::default()
            },
        )
    }

    #[test]
    fn zero_plate_appearances_is_rejected() {
        let roster = Roster::new(vec![player("a", 1, 1), player("b", 0, 0)]).unwrap();
        let request = OptimizeRequest::whole_roster(roster, LineupKind::Standard);
        let err = request.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Can not optimize lineup because player B (b) has no plate appearances"
        );
    }

    #[test]
    fn unselected_players_are_not_validated() {
        let roster = Roster::new(vec![player("a", 1, 1), player("b", 0, 0)]).unwrap();
        let request = OptimizeRequest::new(roster, vec!["a".into()], LineupKind::Standard);
        assert_eq!(request.validate().unwrap().len(), 1);
    }

    #[test]
    fn resumable_checks() {
        let existing = OptimizationResult::new(OptimizerKind::Exhaustive, 6);
        assert!(check_resumable(&existing, OptimizerKind::Exhaustive, 6).is_ok());
        assert!(matches!(
            check_resumable(&existing, OptimizerKind::Adaptive, 6),
            Err(OptimizeError::IncompatibleCheckpoint(_))
        ));
        assert!(check_resumable(&existing, OptimizerKind::Exhaustive, 24).is_err());
    }

    #[test]
    fn projection() {
        assert_eq!(project_remaining_ms(100, 2.0), Some(50));
        assert_eq!(project_remaining_ms(100, 0.0), None);
    }
}
