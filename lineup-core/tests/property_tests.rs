//! Property tests for ranking invariants.
//!
//! Uses proptest to verify:
//! 1. Permutation unranking is inverted by ranking for every n up to 20
//! 2. Combination ranking round-trips
//! 3. Every indexer variant round-trips rank → lineup → rank
//! 4. Gendered indexer sizes follow their closed forms

use proptest::prelude::*;

use lineup_core::combinatorics::{
    binomial, combination_at, combination_index_of, factorial, permutation_at,
    permutation_index_of,
};
use lineup_core::{Gender, LineupKind, OutcomeCounts, Player, Roster};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_n_and_rank() -> impl Strategy<Value = (usize, u64)> {
    (1usize..=20).prop_flat_map(|n| {
        let size = factorial(n).unwrap();
        (Just(n), 0..size)
    })
}

fn roster(males: usize, females: usize) -> Roster {
    let outcomes = OutcomeCounts {
        singles: 1,
        outs: 2,
        ..OutcomeCounts::default()
    };
    let mut players = Vec::new();
    for i in 0..males {
        players.push(Player::new(format!("m{i}"), format!("Man {i}"), Gender::Male, outcomes));
    }
    for i in 0..females {
        players.push(Player::new(format!("f{i}"), format!("Woman {i}"), Gender::Female, outcomes));
    }
    Roster::new(players).unwrap()
}

// ── 1. Permutations ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn permutation_round_trip((n, rank) in arb_n_and_rank()) {
        let order = permutation_at(n, rank).unwrap();
        let back = permutation_index_of(&order).unwrap();
        prop_assert_eq!(back, rank);
        prop_assert_eq!(permutation_at(n, back).unwrap(), order);
    }
}

// ── 2. Combinations ──────────────────────────────────────────────────

proptest! {
    #[test]
    fn combination_round_trip(k in 1usize..10, rank in 0u64..1_000_000) {
        let subset = combination_at(k, rank);
        prop_assert_eq!(subset.len(), k);
        prop_assert!(subset.windows(2).all(|w| w[0] < w[1]));
        prop_assert_eq!(combination_index_of(&subset).unwrap(), rank);
    }
}

// ── 3. Indexer round trips ───────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn standard_round_trip(n in 1usize..=12, seed in any::<u64>()) {
        let roster = roster(n, 0);
        let indexer = LineupKind::Standard.build(&roster, &roster.ids()).unwrap();
        let rank = seed % indexer.size();
        let lineup = indexer.lineup_at(rank).unwrap();
        prop_assert_eq!(indexer.index_of(&lineup).unwrap(), rank);
    }

    #[test]
    fn alternating_round_trip(m in 1usize..=6, f in 1usize..=6, seed in any::<u64>()) {
        let roster = roster(m, f);
        let indexer = LineupKind::AlternatingGender.build(&roster, &roster.ids()).unwrap();
        let rank = seed % indexer.size();
        let lineup = indexer.lineup_at(rank).unwrap();
        prop_assert_eq!(indexer.index_of(&lineup).unwrap(), rank);
    }

    #[test]
    fn no_consecutive_females_round_trip(f in 0usize..=6, extra in 0usize..=4, seed in any::<u64>()) {
        let m = (f + extra).max(1);
        let roster = roster(m, f);
        let indexer = LineupKind::NoConsecutiveFemales.build(&roster, &roster.ids()).unwrap();
        let rank = seed % indexer.size();
        let lineup = indexer.lineup_at(rank).unwrap();
        prop_assert_eq!(indexer.index_of(&lineup).unwrap(), rank);
    }

    #[test]
    fn no_three_males_round_trip(f in 1usize..=6, extra in 0usize..=6, seed in any::<u64>()) {
        let m = f + extra.min(f);
        let roster = roster(m, f);
        let indexer = LineupKind::NoConsecutiveFemalesAndNoThreeConsecutiveMales
            .build(&roster, &roster.ids())
            .unwrap();
        let rank = seed % indexer.size();
        let lineup = indexer.lineup_at(rank).unwrap();
        prop_assert_eq!(indexer.index_of(&lineup).unwrap(), rank);
    }
}

// ── 4. Closed-form sizes ─────────────────────────────────────────────

proptest! {
    #[test]
    fn no_consecutive_females_size(f in 1usize..=6, extra in 0usize..=4) {
        let m = f + extra;
        let roster = roster(m, f);
        let indexer = LineupKind::NoConsecutiveFemales.build(&roster, &roster.ids()).unwrap();
        let expected = factorial(m).unwrap()
            * factorial(f).unwrap()
            * (binomial(m as i64, f as i64) + binomial(m as i64 - 1, f as i64 - 1));
        prop_assert_eq!(indexer.size(), expected);
    }
}
