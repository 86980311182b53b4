//! Combinatorics primitives: factorial/binomial lookup and rank ↔ ordering maps.
//!
//! Permutations are ranked with the Myrvold–Ruskey linear-time scheme, shifted
//! so that rank 0 is the identity ordering. The order is NOT lexicographic;
//! callers may only rely on the map being a bijection over `[0, n!)`.
//!
//! Combinations use the combinatorial number system (colex order): the k-subset
//! `{c_0 < c_1 < ... < c_{k-1}}` has rank `sum C(c_i, i + 1)`.

use thiserror::Error;

/// Largest `n` for which `n!` fits in a `u64`.
pub const MAX_FACTORIAL: usize = 20;

const FACTORIALS: [u64; MAX_FACTORIAL + 1] = build_factorials();

const fn build_factorials() -> [u64; MAX_FACTORIAL + 1] {
    let mut table = [1u64; MAX_FACTORIAL + 1];
    let mut i = 1;
    while i <= MAX_FACTORIAL {
        table[i] = table[i - 1] * i as u64;
        i += 1;
    }
    table
}

/// Errors from the combinatorics primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombinatoricsError {
    #[error("factorial of {0} exceeds the supported range [0, 20]")]
    FactorialOutOfRange(usize),
    #[error("rank {rank} is out of range for {n} elements (size {size})")]
    RankOutOfRange { n: usize, rank: u64, size: u64 },
    #[error("ordering {0:?} is not a permutation of 0..n")]
    NotAPermutation(Vec<usize>),
    #[error("subset {0:?} is not strictly increasing")]
    NotASubset(Vec<usize>),
}

/// `n!` from the lookup table.
pub fn factorial(n: usize) -> Result<u64, CombinatoricsError> {
    FACTORIALS
        .get(n)
        .copied()
        .ok_or(CombinatoricsError::FactorialOutOfRange(n))
}

/// `C(n, k)`, zero when `k < 0` or `k > n`. Saturates at `u64::MAX`.
pub fn binomial(n: i64, k: i64) -> u64 {
    if k < 0 || n < 0 || k > n {
        return 0;
    }
    let k = k.min(n - k) as u128;
    let n = n as u128;
    let mut result: u128 = 1;
    for i in 0..k {
        result = result * (n - i) / (i + 1);
        if result > u64::MAX as u128 {
            return u64::MAX;
        }
    }
    result as u64
}

// ─── Permutations ────────────────────────────────────────────────────

/// The `rank`-th permutation of `[0, n)`.
///
/// Unranking is iterative over an explicit swap array, so `n = 20` needs no
/// recursion.
pub fn permutation_at(n: usize, rank: u64) -> Result<Vec<usize>, CombinatoricsError> {
    let size = factorial(n)?;
    if rank >= size {
        return Err(CombinatoricsError::RankOutOfRange { n, rank, size });
    }

    // Rank 0 maps to the identity, which is the last Myrvold–Ruskey rank.
    let mut r = if rank == 0 { size - 1 } else { rank - 1 };

    let mut order: Vec<usize> = (0..n).collect();
    for len in (1..=n).rev() {
        let len_u64 = len as u64;
        order.swap(len - 1, (r % len_u64) as usize);
        r /= len_u64;
    }
    Ok(order)
}

/// Inverse of [`permutation_at`].
pub fn permutation_index_of(order: &[usize]) -> Result<u64, CombinatoricsError> {
    let n = order.len();
    let size = factorial(n)?;

    let mut perm = order.to_vec();
    let mut inverse = vec![usize::MAX; n];
    for (position, &value) in order.iter().enumerate() {
        if value >= n || inverse[value] != usize::MAX {
            return Err(CombinatoricsError::NotAPermutation(order.to_vec()));
        }
        inverse[value] = position;
    }

    // Peel off one mixed-radix digit per length, outermost first.
    let mut digits = Vec::with_capacity(n);
    for len in (2..=n).rev() {
        let s = perm[len - 1];
        let swap_with = inverse[len - 1];
        perm.swap(len - 1, swap_with);
        inverse.swap(s, len - 1);
        digits.push((len as u64, s as u64));
    }

    let mut r: u64 = 0;
    for &(len, digit) in digits.iter().rev() {
        r = digit + len * r;
    }

    Ok(if r == size - 1 { 0 } else { r + 1 })
}

/// Reorder `items` by `order`: `result[i] = items[order[i]]`.
pub fn apply_order<T: Clone>(items: &[T], order: &[usize]) -> Vec<T> {
    order.iter().map(|&i| items[i].clone()).collect()
}

// ─── Combinations ────────────────────────────────────────────────────

/// The `rank`-th k-subset of `{0, 1, 2, ...}` in colex order, ascending.
pub fn combination_at(k: usize, rank: u64) -> Vec<usize> {
    let mut subset = vec![0usize; k];
    let mut remaining = rank;
    for i in (0..k).rev() {
        let choose = i as i64 + 1;
        let mut l = i as i64;
        while binomial(l, choose) <= remaining {
            l += 1;
        }
        subset[i] = (l - 1) as usize;
        remaining -= binomial(l - 1, choose);
    }
    subset
}

/// Inverse of [`combination_at`]. The subset must be strictly increasing.
pub fn combination_index_of(subset: &[usize]) -> Result<u64, CombinatoricsError> {
    if subset.windows(2).any(|w| w[0] >= w[1]) {
        return Err(CombinatoricsError::NotASubset(subset.to_vec()));
    }
    Ok(subset
        .iter()
        .enumerate()
        .map(|(i, &c)| binomial(c as i64, i as i64 + 1))
        .sum())
}

// ─── Tests ───────────────────────────────────────────────────────────
