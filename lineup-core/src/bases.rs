//! Base-running state machine.
//!
//! Every (occupancy, hit) pair is resolved once into a 32-entry table: eight
//! occupancy states times four hit lengths. Runners advance exactly as many
//! bases as the batter; anyone pushed past third scores.

const FIRST: u8 = 0b001;
const SECOND: u8 = 0b010;
const THIRD: u8 = 0b100;

/// Occupancy of first, second and third base.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct BaseState(u8);

impl BaseState {
    pub const EMPTY: BaseState = BaseState(0);

    pub fn new(first: bool, second: bool, third: bool) -> Self {
        let mut bits = 0;
        if first {
            bits |= FIRST;
        }
        if second {
            bits |= SECOND;
        }
        if third {
            bits |= THIRD;
        }
        Self(bits)
    }

    pub fn first(self) -> bool {
        self.0 & FIRST != 0
    }

    pub fn second(self) -> bool {
        self.0 & SECOND != 0
    }

    pub fn third(self) -> bool {
        self.0 & THIRD != 0
    }

    /// Resolve a hit of `bases` (1..=4). Returns the new state and runs scored.
    #[inline]
    pub fn advance(self, bases: u8) -> (BaseState, u32) {
        debug_assert!((1..=4).contains(&bases));
        let t = TRANSITIONS[(self.0 | ((bases - 1) << 3)) as usize];
        (BaseState(t.state), t.runs as u32)
    }
}

#[derive(Debug, Clone, Copy)]
struct Transition {
    state: u8,
    runs: u8,
}

static TRANSITIONS: [Transition; 32] = build_transitions();

const fn build_transitions() -> [Transition; 32] {
    let mut table = [Transition { state: 0, runs: 0 }; 32];
    let mut index = 0;
    while index < 32 {
        let bases = (index >> 3) + 1;
        let mut first = index & FIRST as usize != 0;
        let mut second = index & SECOND as usize != 0;
        let mut third = index & THIRD as usize != 0;
        let mut runs = 0u8;

        // Push everyone up one base per base the batter takes; the batter
        // enters on the first push.
        let mut step = 0;
        while step < bases {
            if third {
                runs += 1;
            }
            third = second;
            second = first;
            first = step == 0;
            step += 1;
        }

        let mut state = 0u8;
        if first {
            state |= FIRST;
        }
        if second {
            state |= SECOND;
        }
        if third {
            state |= THIRD;
        }
        table[index] = Transition { state, runs };
        index += 1;
    }
    table
}
