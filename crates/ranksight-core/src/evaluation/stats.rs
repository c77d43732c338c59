//! Statistical utilities for evaluation rigor.
//!
//! This module provides:
//! - Bootstrap confidence intervals for per-query metrics such as RR
//! - Spearman rank correlation for comparing two orderings of the same items
//!
//! # References
//!
//! - Efron & Tibshirani (1993). "An Introduction to the Bootstrap"
//! - Spearman (1904). "The proof and measurement of association between two things"

/// Result of bootstrap confidence interval computation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BootstrapResult {
    /// Sample mean
    pub mean: f64,
    /// Lower bound of confidence interval
    pub lower: f64,
    /// Upper bound of confidence interval
    pub upper: f64,
}

impl BootstrapResult {
    /// Formats the result as "mean [lower, upper]".
    pub fn format(&self, precision: usize) -> String {
        format!(
            "{:.prec$} [{:.prec$}, {:.prec$}]",
            self.mean,
            self.lower,
            self.upper,
            prec = precision
        )
    }
}

/// Computes a bootstrap 95% confidence interval for the mean.
///
/// 1. Resample `values` with replacement `n_bootstrap` times
/// 2. Compute the mean of each resample
/// 3. Take the 2.5th and 97.5th percentiles as the CI bounds
///
/// # Arguments
///
/// * `values` - Per-query values (e.g. reciprocal ranks)
/// * `n_bootstrap` - Number of resamples (see [`crate::config::BOOTSTRAP_RESAMPLES`])
/// * `seed` - Random seed; the same seed always yields the same interval
///
/// # Returns
///
/// None if `values` is empty or `n_bootstrap` is zero.
///
/// # Example
///
/// ```
/// use ranksight_core::evaluation::bootstrap_ci;
///
/// let rr = vec![1.0, 0.5, 0.0, 1.0, 0.25];
/// let ci = bootstrap_ci(&rr, 1000, 42).unwrap();
/// assert!(ci.lower <= ci.mean && ci.mean <= ci.upper);
/// ```
pub fn bootstrap_ci(values: &[f64], n_bootstrap: usize, seed: u64) -> Option<BootstrapResult> {
    if values.is_empty() || n_bootstrap == 0 {
        return None;
    }

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;

    let mut rng = LcgRng::new(seed);
    let mut bootstrap_means = Vec::with_capacity(n_bootstrap);

    for _ in 0..n_bootstrap {
        let mut sum = 0.0;
        for _ in 0..n {
            sum += values[rng.next_usize(n)];
        }
        bootstrap_means.push(sum / n as f64);
    }

    bootstrap_means.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let last = bootstrap_means.len() - 1;
    let lower_idx = (((n_bootstrap as f64) * 0.025) as usize).min(last);
    let upper_idx = (((n_bootstrap as f64) * 0.975) as usize).min(last);

    Some(BootstrapResult {
        mean,
        lower: bootstrap_means[lower_idx],
        upper: bootstrap_means[upper_idx],
    })
}

/// Spearman rank correlation between two paired samples.
///
/// Ties receive the average of the ranks they span, and the coefficient is the
/// Pearson correlation of those ranks.
///
/// # Returns
///
/// A value in [-1, 1], or None when there are fewer than two pairs, the
/// lengths differ, or either side has zero variance.
pub fn spearman_correlation(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }

    let rx = average_ranks(xs);
    let ry = average_ranks(ys);
    pearson(&rx, &ry)
}

fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len() as f64;
    let mean_x = xs.iter().sum::<f64>() / n;
    let mean_y = ys.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return None;
    }
    Some((cov / (var_x.sqrt() * var_y.sqrt())).clamp(-1.0, 1.0))
}

/// 1-based ranks, ties averaged.
fn average_ranks(values: &[f64]) -> Vec<f64> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; values.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // Positions i..=j share the average of ranks i+1..=j+1
        let avg = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}

// ============================================================================
// Internal: Simple LCG RNG
// ============================================================================

/// Linear Congruential Generator for reproducible resampling.
///
/// Not cryptographically secure; only used to make bootstrap runs repeatable.
struct LcgRng {
    state: u64,
}

impl LcgRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next(&mut self) -> u64 {
        // Knuth's MMIX multiplier
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_usize(&mut self, max: usize) -> usize {
        // High bits have the longest period
        ((self.next() >> 33) as usize) % max
    }
}
