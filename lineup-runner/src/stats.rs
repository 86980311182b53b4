//! Running sample statistics and Welch's two-sample t-test.
//!
//! Implements from first principles:
//! - Welford accumulation of count, mean and sum of squared deviations, with
//!   an exact merge of two accumulators
//! - Lanczos approximation for ln(Gamma)
//! - Regularized incomplete beta function
//! - Student's t-distribution CDF
//! - Two-sided Welch t-test (unequal variances, Welch–Satterthwaite df)
//! - A mean shift that turns the t-test into "are these means within some
//!   range of each other"

use serde::{Deserialize, Serialize};

// ─── Sample statistics ───────────────────────────────────────────────

/// Running summary of a sample: count, mean and `M2` (sum of squared
/// deviations from the mean).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleStats {
    pub n: u64,
    pub mean: f64,
    pub m2: f64,
}

impl SampleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, x: f64) {
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / self.n as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Combine another sample into this one (Chan et al. parallel update).
    pub fn merge(&mut self, other: &SampleStats) {
        if other.n == 0 {
            return;
        }
        if self.n == 0 {
            *self = *other;
            return;
        }
        let n_a = self.n as f64;
        let n_b = other.n as f64;
        let n = n_a + n_b;
        let delta = other.mean - self.mean;
        self.mean += delta * n_b / n;
        self.m2 += other.m2 + delta * delta * n_a * n_b / n;
        self.n += other.n;
    }

    /// Unbiased sample variance; 0 for fewer than two observations.
    pub fn variance(&self) -> f64 {
        if self.n < 2 {
            0.0
        } else {
            self.m2 / (self.n - 1) as f64
        }
    }
}

// ─── Math primitives ─────────────────────────────────────────────────

/// Lanczos approximation for ln(Gamma(x)), g=7, n=9.
fn ln_gamma(x: f64) -> f64 {
    #[allow(clippy::excessive_precision)]
    const COEFFICIENTS: [f64; 9] = [
        0.99999999999980993,
        676.5203681218851,
        -1259.1392167224028,
        771.32342877765313,
        -176.61502916214059,
        12.507343278686905,
        -0.13857109526572012,
        9.9843695780195716e-6,
        1.5056327351493116e-7,
    ];
    const G: f64 = 7.0;

    if x < 0.5 {
        // Reflection: Gamma(x) * Gamma(1-x) = pi / sin(pi*x)
        let sin_val = (std::f64::consts::PI * x).sin();
        if sin_val.abs() < 1e-300 {
            return f64::INFINITY;
        }
        return std::f64::consts::PI.ln() - sin_val.abs().ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let sum = COEFFICIENTS
        .iter()
        .enumerate()
        .skip(1)
        .fold(COEFFICIENTS[0], |acc, (i, &c)| acc + c / (x + i as f64));
    let t = x + G + 0.5;
    0.5 * (2.0 * std::f64::consts::PI).ln() + (x + 0.5) * t.ln() - t + sum.ln()
}

/// Regularized incomplete beta function I_x(a, b), modified Lentz continued
/// fraction.
fn regularized_incomplete_beta(a: f64, b: f64, x: f64) -> f64 {
    if !(0.0..=1.0).contains(&x) {
        return f64::NAN;
    }
    if x == 0.0 || x == 1.0 {
        return x;
    }
    if x > (a + 1.0) / (a + b + 2.0) {
        return 1.0 - regularized_incomplete_beta(b, a, 1.0 - x);
    }

    let ln_prefix =
        a * x.ln() + b * (1.0 - x).ln() - ln_gamma(a) - ln_gamma(b) + ln_gamma(a + b) - a.ln();

    const MAX_ITER: usize = 300;
    const EPSILON: f64 = 1e-14;
    const TINY: f64 = 1e-30;

    let clamp = |v: f64| if v.abs() < TINY { TINY } else { v };

    let mut c = 1.0_f64;
    let mut d = 1.0 / clamp(1.0 - (a + b) * x / (a + 1.0));
    let mut f = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;

        let even = m * (b - m) * x / ((a + 2.0 * m - 1.0) * (a + 2.0 * m));
        d = 1.0 / clamp(1.0 + even * d);
        c = clamp(1.0 + even / c);
        f *= c * d;

        let odd = -((a + m) * (a + b + m) * x) / ((a + 2.0 * m) * (a + 2.0 * m + 1.0));
        d = 1.0 / clamp(1.0 + odd * d);
        c = clamp(1.0 + odd / c);
        let delta = c * d;
        f *= delta;

        if (delta - 1.0).abs() < EPSILON {
            break;
        }
    }

    ln_prefix.exp() * f
}

/// Student's t-distribution CDF: P(T <= t) for `df` degrees of freedom.
pub(crate) fn t_cdf(t: f64, df: f64) -> f64 {
    if df <= 0.0 || t.is_nan() {
        return f64::NAN;
    }
    if t == 0.0 {
        return 0.5;
    }
    let ib = regularized_incomplete_beta(df / 2.0, 0.5, df / (df + t * t));
    if t > 0.0 {
        1.0 - 0.5 * ib
    } else {
        0.5 * ib
    }
}

// ─── Welch t-test ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TTestResult {
    /// (mean_a - mean_b) / standard error of the difference.
    pub t_statistic: f64,
    /// Two-sided p-value.
    pub p_value: f64,
    /// Welch–Satterthwaite degrees of freedom.
    pub df: f64,
}

/// Two-sided Welch t-test of H0: mean_a == mean_b.
///
/// Returns `None` unless both samples hold at least two observations. When
/// both samples have zero variance the test degenerates: identical means give
/// p = 1, different means give p = 0.
pub fn welch_t_test(a: &SampleStats, b: &SampleStats) -> Option<TTestResult> {
    if a.n < 2 || b.n < 2 {
        return None;
    }
    let va = a.variance() / a.n as f64;
    let vb = b.variance() / b.n as f64;
    let se2 = va + vb;
    let diff = a.mean - b.mean;

    if se2 <= 1e-300 {
        let df = (a.n + b.n - 2) as f64;
        return Some(if diff.abs() < 1e-12 {
            TTestResult {
                t_statistic: 0.0,
                p_value: 1.0,
                df,
            }
        } else {
            TTestResult {
                t_statistic: diff.signum() * f64::INFINITY,
                p_value: 0.0,
                df,
            }
        });
    }

    let t = diff / se2.sqrt();
    let df = se2 * se2
        / (va * va / (a.n - 1) as f64 + vb * vb / (b.n - 1) as f64);
    // Doubling the lower tail avoids 1 - CDF cancellation.
    let p_value = (2.0 * t_cdf(-t.abs(), df)).clamp(0.0, 1.0);
    Some(TTestResult {
        t_statistic: t,
        p_value,
        df,
    })
}

// ─── Mean shift ──────────────────────────────────────────────────────

/// Pushes the sample with the higher mean further up by `range` (the second
/// sample on a tie), leaving variances alone. A t-test on the shifted pair
/// separates lineups whose true means lie within `range` of each other, and
/// a wider range gets there with fewer samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanShift {
    range: f64,
}

impl MeanShift {
    pub fn new(range: f64) -> Self {
        Self {
            range: range.abs(),
        }
    }

    pub fn range(&self) -> f64 {
        self.range
    }

    pub fn apply(&self, a: &SampleStats, b: &SampleStats) -> (SampleStats, SampleStats) {
        let shifted = |s: &SampleStats| SampleStats {
            mean: s.mean + self.range,
            ..*s
        };
        if a.mean > b.mean {
            (shifted(a), *b)
        } else {
            (*a, shifted(b))
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
