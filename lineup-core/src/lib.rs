//! Lineup Core — the batting-order search engine.
//!
//! Pure, synchronous building blocks shared by both optimizers:
//! - Combinatorics primitives (factorial/binomial, permutation and
//!   combination ranking)
//! - Roster and lineup value types
//! - Lineup indexers for the four structural variants
//! - Empirical hit generator, base-state table and game simulator
//! - Deterministic RNG hierarchy

pub mod bases;
pub mod combinatorics;
pub mod hit;
pub mod indexer;
pub mod lineup;
pub mod player;
pub mod rng;
pub mod simulation;

pub use bases::BaseState;
pub use combinatorics::{
    binomial, combination_at, combination_index_of, factorial, permutation_at,
    permutation_index_of, CombinatoricsError,
};
pub use hit::{Hit, HitGenerator, SimulationError};
pub use indexer::{
    AlternatingGenderIndexer, IndexerError, LineupIndexer, LineupKind,
    NoConsecutiveFemalesIndexer, NoConsecutiveFemalesNoThreeMalesIndexer, StandardIndexer,
};
pub use lineup::Lineup;
pub use player::{Gender, OutcomeCounts, Player, PlayerId, Roster, RosterError};
pub use rng::RngHierarchy;
pub use simulation::{simulate_game, simulate_games, BattingOrder, MAX_RUNS_PER_INNING};
