//! Alternating-gender lineups: men and women take turns at the plate.
//!
//! Rank layout: `rank = lead * (m! f!) + women_rank * m! + men_rank`, where
//! `lead` is 0 when a man leads off and 1 when a woman does.

use super::{
    check_player_count, checked_size, not_producible, split_by_gender, IndexerError,
    LineupIndexer, PlayerGroup,
};
use crate::lineup::Lineup;
use crate::player::{Player, PlayerId};

const VARIANT: &str = "alternating-gender";

#[derive(Debug, Clone)]
pub struct AlternatingGenderIndexer {
    men: PlayerGroup,
    women: PlayerGroup,
    size: u64,
}

impl AlternatingGenderIndexer {
    pub fn new(players: &[Player]) -> Result<Self, IndexerError> {
        check_player_count(players.len())?;
        let (males, females) = split_by_gender(players);
        if males.is_empty() || females.is_empty() {
            return Err(IndexerError::Structure {
                variant: VARIANT,
                males: males.len(),
                females: females.len(),
                requirement: "at least one player of each gender is required",
            });
        }
        let men = PlayerGroup::new(males)?;
        let women = PlayerGroup::new(females)?;
        let size = checked_size(VARIANT, &[men.permutations(), women.permutations(), 2])?;
        Ok(Self { men, women, size })
    }

    fn half(&self) -> u64 {
        self.size / 2
    }
}

impl LineupIndexer for AlternatingGenderIndexer {
    fn size(&self) -> u64 {
        self.size
    }

    fn lineup_at(&self, rank: u64) -> Option<Lineup> {
        if rank >= self.size {
            return None;
        }
        let men_rank = rank % self.men.permutations();
        let women_rank = (rank / self.men.permutations()) % self.women.permutations();
        let men = self.men.ordered(men_rank);
        let women = self.women.ordered(women_rank);

        Some(if rank < self.half() {
            Lineup::alternating(men, women)
        } else {
            Lineup::alternating(women, men)
        })
    }

    fn index_of(&self, lineup: &Lineup) -> Result<u64, IndexerError> {
        let Lineup::Alternating { leading, trailing } = lineup else {
            return Err(not_producible(lineup));
        };
        let women_lead = leading.first().is_some_and(|id| self.women.contains(id));
        let (men, women): (&[PlayerId], &[PlayerId]) = if women_lead {
            (trailing, leading)
        } else {
            (leading, trailing)
        };

        let men_refs: Vec<&PlayerId> = men.iter().collect();
        let women_refs: Vec<&PlayerId> = women.iter().collect();
        let men_rank = self.men.rank_of(&men_refs).map_err(|_| not_producible(lineup))?;
        let women_rank = self
            .women
            .rank_of(&women_refs)
            .map_err(|_| not_producible(lineup))?;

        let rank = women_rank * self.men.permutations() + men_rank;
        Ok(if women_lead { rank + self.half() } else { rank })
    }
}
