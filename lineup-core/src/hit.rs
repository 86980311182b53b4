//! Empirical plate-appearance outcome sampler.
//!
//! Each player gets a flat bucket in which every outcome code appears once per
//! observed occurrence, so a uniform draw from the bucket reproduces the
//! player's observed rates exactly. Walks count as singles; sacrifices count
//! as outs.

use std::collections::HashMap;

use rand::Rng;
use thiserror::Error;

use crate::player::{Player, PlayerId};

/// Bases earned by a plate appearance; 0 is an out.
pub type Hit = u8;

pub const OUT: Hit = 0;
pub const SINGLE: Hit = 1;
pub const DOUBLE: Hit = 2;
pub const TRIPLE: Hit = 3;
pub const HOME_RUN: Hit = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("Can not optimize lineup because player {name} ({id}) has no plate appearances")]
    NoPlateAppearances { name: String, id: PlayerId },
    #[error("player '{0}' has no outcome data in this hit generator")]
    UnknownPlayer(PlayerId),
}

/// Read-only after construction; shared across worker threads.
#[derive(Debug, Clone)]
pub struct HitGenerator {
    slots: HashMap<PlayerId, usize>,
    buckets: Vec<Vec<Hit>>,
}

impl HitGenerator {
    pub fn new(players: &[Player]) -> Result<Self, SimulationError> {
        let mut slots = HashMap::with_capacity(players.len());
        let mut buckets = Vec::with_capacity(players.len());
        for player in players {
            let bucket = build_bucket(player);
            if bucket.is_empty() {
                return Err(SimulationError::NoPlateAppearances {
                    name: player.name.clone(),
                    id: player.id.clone(),
                });
            }
            slots.insert(player.id.clone(), buckets.len());
            buckets.push(bucket);
        }
        Ok(Self { slots, buckets })
    }

    /// Bucket slot for `id`, resolved once per lineup so at-bats skip the map.
    pub fn slot_of(&self, id: &PlayerId) -> Result<usize, SimulationError> {
        self.slots
            .get(id)
            .copied()
            .ok_or_else(|| SimulationError::UnknownPlayer(id.clone()))
    }

    /// Draw one outcome for the player in `slot`.
    #[inline]
    pub fn hit<R: Rng + ?Sized>(&self, slot: usize, rng: &mut R) -> Hit {
        let bucket = &self.buckets[slot];
        bucket[rng.gen_range(0..bucket.len())]
    }
}

fn build_bucket(player: &Player) -> Vec<Hit> {
    let c = &player.outcomes;
    let mut bucket = Vec::with_capacity(c.plate_appearances() as usize);
    let mut push = |code: Hit, count: u32| bucket.extend(std::iter::repeat(code).take(count as usize));
    push(HOME_RUN, c.home_runs);
    push(TRIPLE, c.triples);
    push(DOUBLE, c.doubles);
    push(SINGLE, c.singles + c.walks);
    push(OUT, c.outs + c.sacrifices);
    bucket
}
