//! Batting lineup value type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::player::PlayerId;

/// A concrete batting order produced by a lineup indexer.
///
/// Equality is by the ordered player-id sequence(s).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Lineup {
    /// One fixed sequence, repeated from the top after the last batter.
    Ordered { batters: Vec<PlayerId> },
    /// Two groups that alternate at-bats. Each group cycles on its own, so
    /// groups of unequal size drift relative to each other.
    Alternating {
        leading: Vec<PlayerId>,
        trailing: Vec<PlayerId>,
    },
}

impl Lineup {
    pub fn ordered(batters: Vec<PlayerId>) -> Self {
        Self::Ordered { batters }
    }

    pub fn alternating(leading: Vec<PlayerId>, trailing: Vec<PlayerId>) -> Self {
        Self::Alternating { leading, trailing }
    }

    /// Number of distinct players in the lineup.
    pub fn len(&self) -> usize {
        match self {
            Self::Ordered { batters } => batters.len(),
            Self::Alternating { leading, trailing } => leading.len() + trailing.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The player batting in plate-appearance slot `i` (0-based, unbounded).
    pub fn batter(&self, i: usize) -> &PlayerId {
        match self {
            Self::Ordered { batters } => &batters[i % batters.len()],
            Self::Alternating { leading, trailing } => {
                if i % 2 == 0 {
                    &leading[(i / 2) % leading.len()]
                } else {
                    &trailing[(i / 2) % trailing.len()]
                }
            }
        }
    }

    /// First-pass listing of the lineup. Alternating groups interleave until
    /// the shorter one runs out, then the rest of the longer group follows.
    pub fn players(&self) -> Vec<PlayerId> {
        match self {
            Self::Ordered { batters } => batters.clone(),
            Self::Alternating { leading, trailing } => {
                let mut out = Vec::with_capacity(leading.len() + trailing.len());
                let longest = leading.len().max(trailing.len());
                for i in 0..longest {
                    if let Some(p) = leading.get(i) {
                        out.push(p.clone());
                    }
                    if let Some(p) = trailing.get(i) {
                        out.push(p.clone());
                    }
                }
                out
            }
        }
    }

    /// Number of plate appearances before the batting pattern repeats.
    pub fn cycle_len(&self) -> usize {
        match self {
            Self::Ordered { batters } => batters.len(),
            Self::Alternating { leading, trailing } => 2 * lcm(leading.len(), trailing.len()),
        }
    }
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

fn lcm(a: usize, b: usize) -> usize {
    if a == 0 || b == 0 {
        0
    } else {
        a / gcd(a, b) * b
    }
}

impl fmt::Display for Lineup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ordered { batters } => {
                let ids: Vec<&str> = batters.iter().map(PlayerId::as_str).collect();
                write!(f, "[{}]", ids.join(", "))
            }
            Self::Alternating { leading, trailing } => {
                let a: Vec<&str> = leading.iter().map(PlayerId::as_str).collect();
                let b: Vec<&str> = trailing.iter().map(PlayerId::as_str).collect();
                write!(f, "[{}] / [{}]", a.join(", "), b.join(", "))
            }
        }
    }
}
