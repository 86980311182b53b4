//! Unconstrained lineups: every ordering of the players.

use rand::{Rng, RngCore};

use super::{check_player_count, not_producible, IndexerError, LineupIndexer, PlayerGroup};
use crate::combinatorics::{permutation_at, permutation_index_of};
use crate::lineup::Lineup;
use crate::player::Player;

#[derive(Debug, Clone)]
pub struct StandardIndexer {
    group: PlayerGroup,
}

impl StandardIndexer {
    pub fn new(players: &[Player]) -> Result<Self, IndexerError> {
        check_player_count(players.len())?;
        let ids = players.iter().map(|p| p.id.clone()).collect();
        Ok(Self {
            group: PlayerGroup::new(ids)?,
        })
    }
}

impl LineupIndexer for StandardIndexer {
    fn size(&self) -> u64 {
        self.group.permutations()
    }

    fn lineup_at(&self, rank: u64) -> Option<Lineup> {
        if rank >= self.size() {
            return None;
        }
        Some(Lineup::ordered(self.group.ordered(rank)))
    }

    fn index_of(&self, lineup: &Lineup) -> Result<u64, IndexerError> {
        match lineup {
            Lineup::Ordered { batters } => {
                let refs: Vec<_> = batters.iter().collect();
                self.group.rank_of(&refs)
            }
            Lineup::Alternating { .. } => Err(not_producible(lineup)),
        }
    }

    /// Swap two random batters.
    fn random_neighbor(&self, rank: u64, rng: &mut dyn RngCore) -> Option<u64> {
        let n = self.group.len();
        if n < 2 || rank >= self.size() {
            return None;
        }
        let mut order = permutation_at(n, rank).ok()?;
        let a = rng.gen_range(0..n);
        let mut b = rng.gen_range(0..n - 1);
        if b >= a {
            b += 1;
        }
        order.swap(a, b);
        permutation_index_of(&order).ok()
    }
}
