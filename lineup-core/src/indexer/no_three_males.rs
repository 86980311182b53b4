//! Lineups with no two women back to back and no three men back to back.
//!
//! Every woman is paired with a run of one or two men, either just before her
//! (a man leads off) or just after her (a woman leads off). With `f` women and
//! `m` men exactly `m - f` runs hold two men, so valid rosters satisfy
//! `f <= m <= 2f`. The choice of doubled runs is a `(m - f)`-subset of the `f`
//! runs.
//!
//! Rank layout: `rank = (lead * C(f, m-f) + double_rank) * (m! f!)
//! + women_rank * m! + men_rank`, men leading in the first half.

use super::{
    check_player_count, checked_size, not_producible, split_by_gender, IndexerError,
    LineupIndexer, PlayerGroup,
};
use crate::combinatorics::{binomial, combination_at, combination_index_of};
use crate::lineup::Lineup;
use crate::player::{Player, PlayerId};

const VARIANT: &str = "no-consecutive-females-no-three-males";

#[derive(Debug, Clone)]
pub struct NoConsecutiveFemalesNoThreeMalesIndexer {
    men: PlayerGroup,
    women: PlayerGroup,
    /// Number of ways to choose the doubled runs.
    double_combinations: u64,
    size: u64,
}

impl NoConsecutiveFemalesNoThreeMalesIndexer {
    pub fn new(players: &[Player]) -> Result<Self, IndexerError> {
        check_player_count(players.len())?;
        let (males, females) = split_by_gender(players);
        let (m, f) = (males.len(), females.len());
        if f == 0 || m < f || m > 2 * f {
            return Err(IndexerError::Structure {
                variant: VARIANT,
                males: m,
                females: f,
                requirement: "males must number between the number of females and twice that",
            });
        }

        let men = PlayerGroup::new(males)?;
        let women = PlayerGroup::new(females)?;
        let double_combinations = binomial(f as i64, (m - f) as i64);
        let size = checked_size(
            VARIANT,
            &[men.permutations(), women.permutations(), double_combinations, 2],
        )?;
        Ok(Self {
            men,
            women,
            double_combinations,
            size,
        })
    }

    fn doubles(&self) -> usize {
        self.men.len() - self.women.len()
    }

    fn group_span(&self) -> u64 {
        self.men.permutations() * self.women.permutations()
    }
}

impl LineupIndexer for NoConsecutiveFemalesNoThreeMalesIndexer {
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
        let men_lead = slot_rank < self.double_combinations;
        let double_rank = if men_lead {
            slot_rank
        } else {
            slot_rank - self.double_combinations
        };
        let doubled = combination_at(self.doubles(), double_rank);

        let mut men = self.men.ordered(men_rank).into_iter();
        let women = self.women.ordered(women_rank);
        let mut batters = Vec::with_capacity(self.men.len() + self.women.len());
        let mut doubled_iter = doubled.iter().peekable();
        for (run, woman) in women.into_iter().enumerate() {
            let run_len = if doubled_iter.peek() == Some(&&run) {
                doubled_iter.next();
                2
            } else {
                1
            };
            if !men_lead {
                batters.push(woman.clone());
            }
            batters.extend(men.by_ref().take(run_len));
            if men_lead {
                batters.push(woman);
            }
        }
        Some(Lineup::ordered(batters))
    }

    fn index_of(&self, lineup: &Lineup) -> Result<u64, IndexerError> {
        let Lineup::Ordered { batters } = lineup else {
            return Err(not_producible(lineup));
        };
        let Some(first) = batters.first() else {
            return Err(not_producible(lineup));
        };
        let men_lead = self.men.contains(first);

        let mut men: Vec<&PlayerId> = Vec::with_capacity(self.men.len());
        let mut women: Vec<&PlayerId> = Vec::with_capacity(self.women.len());
        let mut runs = Vec::with_capacity(self.women.len());
        let mut run = 0usize;
        for id in batters {
            if self.men.contains(id) {
                run += 1;
                men.push(id);
            } else if self.women.contains(id) {
                if men_lead || !women.is_empty() {
                    runs.push(run);
                    run = 0;
                }
                women.push(id);
            } else {
                return Err(not_producible(lineup));
            }
        }
        if men_lead {
            // A man-led lineup must end on a woman.
            if run != 0 {
                return Err(not_producible(lineup));
            }
        } else {
            runs.push(run);
        }
        if runs.len() != self.women.len() || runs.iter().any(|&r| r == 0 || r > 2) {
            return Err(not_producible(lineup));
        }

        let doubled: Vec<usize> = runs
            .iter()
            .enumerate()
            .filter(|&(_, &r)| r == 2)
            .map(|(i, _)| i)
            .collect();
        let men_rank = self.men.rank_of(&men)?;
        let women_rank = self.women.rank_of(&women)?;
        let double_rank = combination_index_of(&doubled)?;
        let slot_rank = if men_lead {
            double_rank
        } else {
            self.double_combinations + double_rank
        };
        Ok(slot_rank * self.group_span() + women_rank * self.men.permutations() + men_rank)
    }
}
