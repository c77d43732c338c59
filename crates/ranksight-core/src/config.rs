//! Production configuration constants.
//!
//! These values define how evaluation runs behave by default. The CLI exposes
//! most of them as flags or environment overrides; benchmarks and tests use
//! them directly so that everything agrees on the same defaults.
//!
//! # Usage
//!
//! ```
//! use ranksight_core::config::{RRF_K, TOP_K_JUDGE, TOP_K_RETRIEVAL};
//!
//! // Judge depth is deliberately shallower than retrieval depth
//! assert!(TOP_K_JUDGE < TOP_K_RETRIEVAL);
//! assert_eq!(RRF_K, 60);
//! ```

// =============================================================================
// Rank Fusion
// =============================================================================

/// RRF smoothing constant.
///
/// Dampens the influence of the highest ranks so that small rank differences
/// near the top of a list matter less than under raw reciprocal weighting.
/// 60 is the value from Cormack et al. (2009) and is used unchanged here.
pub const RRF_K: usize = 60;

/// How many candidates each channel contributes before hybrid fusion,
/// expressed as a multiple of the requested `top_k`.
pub const HYBRID_CANDIDATE_MULTIPLIER: usize = 2;

// =============================================================================
// Evaluation Depth
// =============================================================================

/// Number of results retrieved per query when scoring retrieval.
pub const TOP_K_RETRIEVAL: usize = 20;

/// Number of top results entered into the pairwise judge tournament.
///
/// A tournament over `n` candidates issues `n * (n - 1)` judge calls
/// (every pair twice), so 10 candidates cost 90 calls per query.
pub const TOP_K_JUDGE: usize = 10;

/// Cutoffs reported as Hit-rate@K.
pub const DEFAULT_HIT_RATE_KS: &[usize] = &[1, 3, 5, 10, 20];

// =============================================================================
// Reporting
// =============================================================================

/// A query whose ground truth ranks below this (or is missing) is a failure case.
pub const FAILURE_RANK_CUTOFF: usize = 10;

/// Emit a progress log line (running MRR / hit rate) every N queries.
pub const PROGRESS_LOG_INTERVAL: usize = 50;

/// Bootstrap resamples used for the MRR confidence interval.
pub const BOOTSTRAP_RESAMPLES: usize = 1000;

/// Fixed seed so that reported confidence intervals are reproducible.
pub const BOOTSTRAP_SEED: u64 = 42;

/// Number of judge calls needed to run a full tournament over `n` candidates.
pub const fn judge_calls_for(n: usize) -> usize {
    if n < 2 {
        0
    } else {
        n * (n - 1)
    }
}
