//! Roster model: players, their outcome counts, and gender.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Stable player identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
}

/// Plate-appearance outcome counts for one player.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub outs: u32,
    pub singles: u32,
    pub doubles: u32,
    pub triples: u32,
    pub home_runs: u32,
    pub walks: u32,
    pub sacrifices: u32,
}

impl OutcomeCounts {
    pub fn hits(&self) -> u32 {
        self.singles + self.doubles + self.triples + self.home_runs
    }

    /// Plate appearances minus walks and sacrifices.
    pub fn at_bats(&self) -> u32 {
        self.outs + self.hits()
    }

    pub fn plate_appearances(&self) -> u32 {
        self.at_bats() + self.walks + self.sacrifices
    }

    /// Hits per at-bat; 0.0 when there are no at-bats.
    pub fn batting_average(&self) -> f64 {
        let at_bats = self.at_bats();
        if at_bats == 0 {
            0.0
        } else {
            self.hits() as f64 / at_bats as f64
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub gender: Gender,
    pub outcomes: OutcomeCounts,
}

impl Player {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        gender: Gender,
        outcomes: OutcomeCounts,
    ) -> Self {
        Self {
            id: PlayerId::new(id),
            name: name.into(),
            gender,
            outcomes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("player '{0}' is not on the roster")]
    UnknownPlayer(PlayerId),
    #[error("player '{0}' is listed more than once")]
    DuplicatePlayer(PlayerId),
}

/// All players available to a search, keyed by id. Deserializing goes
/// through [`Roster::new`], so duplicate ids are rejected there too.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "RosterRecord")]
pub struct Roster {
    players: Vec<Player>,
    #[serde(skip)]
    by_id: HashMap<PlayerId, usize>,
}

/// Serialized form of a [`Roster`].
#[derive(Deserialize)]
struct RosterRecord {
    players: Vec<Player>,
}

impl TryFrom<RosterRecord> for Roster {
    type Error = RosterError;

    fn try_from(record: RosterRecord) -> Result<Self, Self::Error> {
        Roster::new(record.players)
    }
}

impl Roster {
    pub fn new(players: Vec<Player>) -> Result<Self, RosterError> {
        let mut by_id = HashMap::with_capacity(players.len());
        for (i, player) in players.iter().enumerate() {
            if by_id.insert(player.id.clone(), i).is_some() {
                return Err(RosterError::DuplicatePlayer(player.id.clone()));
            }
        }
        Ok(Self { players, by_id })
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.by_id.get(id).and_then(|&i| self.players.get(i))
    }

    /// Resolve `ids` to players, preserving the given order.
    pub fn select(&self, ids: &[PlayerId]) -> Result<Vec<Player>, RosterError> {
        let mut seen = HashMap::with_capacity(ids.len());
        ids.iter()
            .map(|id| {
                if seen.insert(id, ()).is_some() {
                    return Err(RosterError::DuplicatePlayer(id.clone()));
                }
                self.get(id)
                    .cloned()
                    .ok_or_else(|| RosterError::UnknownPlayer(id.clone()))
            })
            .collect()
    }

    pub fn ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id.clone()).collect()
    }
}
