//! Lineup indexers: bijections between a dense integer rank and a lineup.
//!
//! Four structural variants:
//! - [`StandardIndexer`]: any ordering of the players (`n!` lineups).
//! - [`AlternatingGenderIndexer`]: men and women alternate at-bats.
//! - [`NoConsecutiveFemalesIndexer`]: no two women bat back to back, including
//!   the wrap from the last batter to the first.
//! - [`NoConsecutiveFemalesNoThreeMalesIndexer`]: as above, and no three men
//!   bat back to back.
//!
//! Every variant decomposes a rank through a mixed-radix cascade into
//! independent sub-ranks (one permutation per gender group, then a slot
//! combination and/or a leading-group flag) and unranks each one with the
//! primitives in [`crate::combinatorics`].

mod alternating;
mod no_consecutive_females;
mod no_three_males;
mod standard;

pub use alternating::AlternatingGenderIndexer;
pub use no_consecutive_females::NoConsecutiveFemalesIndexer;
pub use no_three_males::NoConsecutiveFemalesNoThreeMalesIndexer;
pub use standard::StandardIndexer;

use std::collections::HashMap;
use std::fmt;

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combinatorics::{
    apply_order, factorial, permutation_at, permutation_index_of, CombinatoricsError,
    MAX_FACTORIAL,
};
use crate::lineup::Lineup;
use crate::player::{Gender, Player, PlayerId, Roster, RosterError};

/// Errors from building or querying a lineup indexer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    #[error("a lineup needs at least one player")]
    NoPlayers,
    #[error("{0} players exceeds the supported maximum of 20")]
    TooManyPlayers(usize),
    #[error("{variant} lineups are not possible with {males} males and {females} females: {requirement}")]
    Structure {
        variant: &'static str,
        males: usize,
        females: usize,
        requirement: &'static str,
    },
    #[error("number of {variant} lineups overflows a 64-bit rank")]
    SizeOverflow { variant: &'static str },
    #[error("lineup {0} cannot be produced by this indexer")]
    NotProducible(String),
    #[error(transparent)]
    Roster(#[from] RosterError),
    #[error(transparent)]
    Combinatorics(#[from] CombinatoricsError),
}

/// Rank ↔ lineup bijection for one structural variant.
///
/// Implementations are immutable after construction and shared read-only
/// across worker threads.
pub trait LineupIndexer: Send + Sync + fmt::Debug {
    /// Number of valid lineups.
    fn size(&self) -> u64;

    /// The lineup at `rank`, or `None` when `rank >= size()`.
    fn lineup_at(&self, rank: u64) -> Option<Lineup>;

    /// Inverse of [`LineupIndexer::lineup_at`].
    fn index_of(&self, lineup: &Lineup) -> Result<u64, IndexerError>;

    /// A rank one small random move away from `rank`. Only variants that
    /// support local search implement this.
    fn random_neighbor(&self, _rank: u64, _rng: &mut dyn RngCore) -> Option<u64> {
        None
    }
}

/// Structural variant selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LineupKind {
    #[default]
    Standard,
    AlternatingGender,
    NoConsecutiveFemales,
    NoConsecutiveFemalesAndNoThreeConsecutiveMales,
}

impl LineupKind {
    pub const ALL: [LineupKind; 4] = [
        LineupKind::Standard,
        LineupKind::AlternatingGender,
        LineupKind::NoConsecutiveFemales,
        LineupKind::NoConsecutiveFemalesAndNoThreeConsecutiveMales,
    ];

    /// Build the indexer for the players `ids` drawn from `roster`.
    ///
    /// Player order within each gender group follows `ids`, so rank 0 is the
    /// lineup closest to the order given.
    pub fn build(
        self,
        roster: &Roster,
        ids: &[PlayerId],
    ) -> Result<Box<dyn LineupIndexer>, IndexerError> {
        let players = roster.select(ids)?;
        Ok(match self {
            LineupKind::Standard => Box::new(StandardIndexer::new(&players)?),
            LineupKind::AlternatingGender => Box::new(AlternatingGenderIndexer::new(&players)?),
            LineupKind::NoConsecutiveFemales => {
                Box::new(NoConsecutiveFemalesIndexer::new(&players)?)
            }
            LineupKind::NoConsecutiveFemalesAndNoThreeConsecutiveMales => {
                Box::new(NoConsecutiveFemalesNoThreeMalesIndexer::new(&players)?)
            }
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            LineupKind::Standard => "standard",
            LineupKind::AlternatingGender => "alternating_gender",
            LineupKind::NoConsecutiveFemales => "no_consecutive_females",
            LineupKind::NoConsecutiveFemalesAndNoThreeConsecutiveMales => {
                "no_consecutive_females_and_no_three_consecutive_males"
            }
        }
    }
}

impl fmt::Display for LineupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ─── Shared helpers ──────────────────────────────────────────────────

/// A fixed group of players whose orderings are addressed by permutation rank.
#[derive(Debug, Clone)]
pub(crate) struct PlayerGroup {
    base: Vec<PlayerId>,
    position: HashMap<PlayerId, usize>,
    permutations: u64,
}

impl PlayerGroup {
    pub(crate) fn new(base: Vec<PlayerId>) -> Result<Self, IndexerError> {
        let permutations = factorial(base.len())?;
        let position = base
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        Ok(Self {
            base,
            position,
            permutations,
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.base.len()
    }

    pub(crate) fn permutations(&self) -> u64 {
        self.permutations
    }

    pub(crate) fn contains(&self, id: &PlayerId) -> bool {
        self.position.contains_key(id)
    }

    /// Players of this group in the order given by `rank`.
    pub(crate) fn ordered(&self, rank: u64) -> Vec<PlayerId> {
        match permutation_at(self.base.len(), rank % self.permutations) {
            Ok(order) => apply_order(&self.base, &order),
            Err(_) => self.base.clone(),
        }
    }

    /// Permutation rank of `players`, which must be exactly this group.
    pub(crate) fn rank_of(&self, players: &[&PlayerId]) -> Result<u64, IndexerError> {
        if players.len() != self.base.len() {
            return Err(not_producible_ids(players));
        }
        let order = players
            .iter()
            .map(|id| self.position.get(*id).copied())
            .collect::<Option<Vec<usize>>>()
            .ok_or_else(|| not_producible_ids(players))?;
        permutation_index_of(&order).map_err(|_| not_producible_ids(players))
    }
}

pub(crate) fn check_player_count(count: usize) -> Result<(), IndexerError> {
    if count == 0 {
        Err(IndexerError::NoPlayers)
    } else if count > MAX_FACTORIAL {
        Err(IndexerError::TooManyPlayers(count))
    } else {
        Ok(())
    }
}

/// Split players into (males, females), each preserving input order.
pub(crate) fn split_by_gender(players: &[Player]) -> (Vec<PlayerId>, Vec<PlayerId>) {
    let mut males = Vec::new();
    let mut females = Vec::new();
    for player in players {
        match player.gender {
            Gender::Male => males.push(player.id.clone()),
            Gender::Female => females.push(player.id.clone()),
        }
    }
    (males, females)
}

/// Multiply sub-space sizes, failing on `u64` overflow.
pub(crate) fn checked_size(variant: &'static str, factors: &[u64]) -> Result<u64, IndexerError> {
    factors
        .iter()
        .try_fold(1u64, |acc, &f| acc.checked_mul(f))
        .ok_or(IndexerError::SizeOverflow { variant })
}

pub(crate) fn not_producible(lineup: &Lineup) -> IndexerError {
    IndexerError::NotProducible(lineup.to_string())
}

fn not_producible_ids(players: &[&PlayerId]) -> IndexerError {
    let ids: Vec<&str> = players.iter().map(|p| p.as_str()).collect();
    IndexerError::NotProducible(format!("[{}]", ids.join(", ")))
}

// ─── Tests ───────────────────────────────────────────────────────────
