//! Lineups in which no two women bat back to back, wrap-around included.
//!
//! The `m` men define `m + 1` slots (slot `s` sits just before man `s`, slot
//! `m` after the last man). Each woman takes a distinct slot. Using both slot
//! 0 and slot `m` would put two women together across the wrap, so the space
//! splits in two:
//! - a woman bats last: she takes slot `m` and the other `f - 1` women choose
//!   from slots `1..m`, `C(m-1, f-1)` ways (these come first);
//! - nobody bats last: all `f` women choose from slots `0..m`, `C(m, f)` ways.
//!
//! Rank layout: `rank = slot_rank * (m! f!) + women_rank * m! + men_rank`.

use super::{
    check_player_count, checked_size, not_producible, split_by_gender, IndexerError,
    LineupIndexer, PlayerGroup,
};
use crate::combinatorics::{binomial, combination_at, combination_index_of};
use crate::lineup::Lineup;
use crate::player::{Player, PlayerId};

const VARIANT: &str = "no-consecutive-females";

#[derive(Debug, Clone)]
pub struct NoConsecutiveFemalesIndexer {
    men: PlayerGroup,
    women: PlayerGroup,
    /// Slot combinations with a woman batting last.
    cutoff: u64,
    size: u64,
}

impl NoConsecutiveFemalesIndexer {
    pub fn new(players: &[Player]) -> Result<Self, IndexerError> {
        check_player_count(players.len())?;
        let (males, females) = split_by_gender(players);
        let (m, f) = (males.len() as i64, females.len() as i64);
        if m < f {
            return Err(IndexerError::Structure {
                variant: VARIANT,
                males: males.len(),
                females: females.len(),
                requirement: "there must be at least as many males as females",
            });
        }

        let men = PlayerGroup::new(males)?;
        let women = PlayerGroup::new(females)?;
        let cutoff = binomial(m - 1, f - 1);
        let slot_combinations = binomial(m, f)
            .checked_add(cutoff)
            .ok_or(IndexerError::SizeOverflow { variant: VARIANT })?;
        let size = checked_size(
            VARIANT,
            &[men.permutations(), women.permutations(), slot_combinations],
        )?;
        Ok(Self {
            men,
            women,
            cutoff,
            size,
        })
    }

    fn group_span(&self) -> u64 {
        self.men.permutations() * self.women.permutations()
    }

    fn merge(&self, men: Vec<PlayerId>, women: Vec<PlayerId>, slots: &[usize]) -> Vec<PlayerId> {
        let total = men.len() + women.len();
        let mut merged = Vec::with_capacity(total);
        let mut men = men.into_iter();
        let mut women = women.into_iter();
        // A woman in slot s lands at lineup position s + (women placed before her).
        let mut spots = slots.iter().enumerate().map(|(i, &s)| s + i).peekable();
        for position in 0..total {
            let next = if spots.peek() == Some(&position) {
                spots.next();
                women.next()
            } else {
                men.next()
            };
            if let Some(id) = next {
                merged.push(id);
            }
        }
        merged
    }
}

impl LineupIndexer for NoConsecutiveFemalesIndexer {
    fn size(&self) -> u64 {
        self.size
    }

    fn lineup_at(&self, rank: u64) -> Option<Lineup> {
        if rank >= self.size {
            return None;
        }
        let men_rank = rank % self.men.permutations();
        let women_rank = (rank / self.men.permutations()) % self.women.permutations();
        let slot_rank = rank / self.group_span();

        let slots: Vec<usize> = if slot_rank < self.cutoff {
            let mut slots: Vec<usize> = combination_at(self.women.len() - 1, slot_rank)
                .into_iter()
                .map(|s| s + 1)
                .collect();
            slots.push(self.men.len());
            slots
        } else {
            combination_at(self.women.len(), slot_rank - self.cutoff)
        };

        let batters = self.merge(self.men.ordered(men_rank), self.women.ordered(women_rank), &slots);
        Some(Lineup::ordered(batters))
    }

    fn index_of(&self, lineup: &Lineup) -> Result<u64, IndexerError> {
        let Lineup::Ordered { batters } = lineup else {
            return Err(not_producible(lineup));
        };
        if batters.len() != self.men.len() + self.women.len() {
            return Err(not_producible(lineup));
        }

        let mut men = Vec::with_capacity(self.men.len());
        let mut women = Vec::with_capacity(self.women.len());
        let mut slots = Vec::with_capacity(self.women.len());
        let mut slot = 0usize;
        let mut previous_male = true;
        for id in batters {
            if self.men.contains(id) {
                if previous_male {
                    slot += 1;
                }
                previous_male = true;
                men.push(id);
            } else if self.women.contains(id) {
                if !previous_male {
                    return Err(not_producible(lineup));
                }
                slots.push(slot);
                slot += 1;
                previous_male = false;
                women.push(id);
            } else {
                return Err(not_producible(lineup));
            }
        }

        let men_rank = self.men.rank_of(&men)?;
        let women_rank = self.women.rank_of(&women)?;
        let woman_last = batters.last().is_some_and(|id| self.women.contains(id));
        let woman_first = batters.first().is_some_and(|id| self.women.contains(id));

        let slot_rank = if woman_last {
            if woman_first {
                return Err(not_producible(lineup));
            }
            slots.pop();
            let shifted: Vec<usize> = slots.iter().map(|s| s - 1).collect();
            combination_index_of(&shifted)?
        } else {
            self.cutoff + combination_index_of(&slots)?
        };

        Ok(slot_rank * self.group_span() + women_rank * self.men.permutations() + men_rank)
    }
}
