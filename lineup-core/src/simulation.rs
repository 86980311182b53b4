//! Monte Carlo game simulation.
//!
//! A game is `innings` half-innings. The batting order carries over between
//! innings; the bases are cleared at the start of each one. A half-inning ends
//! at three outs or when the run cap is reached, which bounds lineups that
//! almost never make an out.

use rand::Rng;

use crate::bases::BaseState;
use crate::hit::{HitGenerator, SimulationError, OUT};
use crate::lineup::Lineup;

/// Runs at which a half-inning is cut short.
pub const MAX_RUNS_PER_INNING: u32 = 100;

const OUTS_PER_INNING: u32 = 3;

/// A lineup resolved to hit-generator slots for one full batting cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BattingOrder {
    cycle: Vec<usize>,
}

impl BattingOrder {
    pub fn resolve(lineup: &Lineup, hits: &HitGenerator) -> Result<Self, SimulationError> {
        let cycle = (0..lineup.cycle_len())
            .map(|i| hits.slot_of(lineup.batter(i)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { cycle })
    }

    pub fn cycle_len(&self) -> usize {
        self.cycle.len()
    }
}

/// Simulate one game and return the total runs scored.
pub fn simulate_game<R: Rng + ?Sized>(
    order: &BattingOrder,
    innings: u32,
    hits: &HitGenerator,
    rng: &mut R,
) -> u32 {
    let cycle = &order.cycle;
    if cycle.is_empty() {
        return 0;
    }
    let mut next = 0usize;
    let mut total = 0u32;
    for _ in 0..innings {
        let mut outs = 0u32;
        let mut runs = 0u32;
        let mut bases = BaseState::EMPTY;
        while outs < OUTS_PER_INNING && runs < MAX_RUNS_PER_INNING {
            let hit = hits.hit(cycle[next], rng);
            next += 1;
            if next == cycle.len() {
                next = 0;
            }
            if hit == OUT {
                outs += 1;
            } else {
                let (state, scored) = bases.advance(hit);
                bases = state;
                runs += scored;
            }
        }
        total += runs;
    }
    total
}

/// Mean runs over `games` simulated games. Zero games yields 0.0.
pub fn simulate_games<R: Rng + ?Sized>(
    order: &BattingOrder,
    innings: u32,
    games: u64,
    hits: &HitGenerator,
    rng: &mut R,
) -> f64 {
    if games == 0 {
        return 0.0;
    }
    let total: u64 = (0..games)
        .map(|_| simulate_game(order, innings, hits, rng) as u64)
        .sum();
    total as f64 / games as f64
}
