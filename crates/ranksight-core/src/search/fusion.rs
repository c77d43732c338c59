//! Reciprocal Rank Fusion (RRF) for merging lexical and vector rankings.
//!
//! # Formula
//!
//! ```text
//! score(id) = Σ 1 / (k + rank_c(id))   over channels c where id appears
//! ```
//!
//! `rank_c` is the 1-indexed position of the id in channel `c`. Channels in
//! which the id is absent contribute nothing. Only ranks are used, never the
//! channel scores, so BM25 and cosine scales never need normalizing.
//!
//! # Ordering
//!
//! Results are sorted by descending fused score with a stable sort. Equal
//! scores keep the order in which ids were first seen, scanning the text
//! channel before the vector channel.
//!
//! # Re-fusion
//!
//! Fusing an already-fused list against an empty second channel keeps the
//! relative order but replaces the scores with `1 / (k + position)`, so the
//! score spread is compressed a second time. This is a known non-round-trip
//! property; callers should fuse raw channel output only.

use super::types::{ProjectId, RankedResult};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Upper bound of an RRF score over two channels (rank 1 in both).
pub fn max_rrf_score(k: usize) -> f64 {
    2.0 / (k as f64 + 1.0)
}

/// Merges two ranked lists with Reciprocal Rank Fusion.
///
/// # Arguments
///
/// * `text_results` - Lexical channel results, most relevant first
/// * `vector_results` - Vector channel results, most relevant first
/// * `k` - RRF smoothing constant (see [`crate::config::RRF_K`])
/// * `top_k` - Maximum number of fused results to return
///
/// # Returns
///
/// The fused ranking. Its id set is exactly the union of both inputs'
/// ids (truncated to `top_k`). Empty inputs yield an empty result.
pub fn reciprocal_rank_fusion(
    text_results: &[RankedResult],
    vector_results: &[RankedResult],
    k: usize,
    top_k: usize,
) -> Vec<RankedResult> {
    // Insertion order doubles as the tie-break
    let mut order: Vec<ProjectId> = Vec::with_capacity(text_results.len() + vector_results.len());
    let mut scores: HashMap<ProjectId, f64> = HashMap::with_capacity(order.capacity());

    for channel in [text_results, vector_results] {
        accumulate_channel(channel, k, &mut order, &mut scores);
    }

    let mut fused: Vec<(ProjectId, f64)> = order
        .into_iter()
        .map(|id| (id, scores.get(&id).copied().unwrap_or(0.0)))
        .collect();

    // sort_by is stable: equal scores keep first-seen order
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    fused.truncate(top_k);

    debug!(
        "RRF fused {} text + {} vector results into {}",
        text_results.len(),
        vector_results.len(),
        fused.len()
    );

    fused
        .into_iter()
        .map(|(id, score)| RankedResult::new(id, score as f32))
        .collect()
}

/// Adds one channel's reciprocal-rank contributions.
///
/// A repeated id within the same channel only counts at its first position.
fn accumulate_channel(
    channel: &[RankedResult],
    k: usize,
    order: &mut Vec<ProjectId>,
    scores: &mut HashMap<ProjectId, f64>,
) {
    let mut seen_in_channel: HashSet<ProjectId> = HashSet::with_capacity(channel.len());

    for (position, result) in channel.iter().enumerate() {
        if !seen_in_channel.insert(result.id) {
            continue;
        }
        let rank = position + 1;
        let contribution = 1.0 / (k + rank) as f64;

        match scores.get_mut(&result.id) {
            Some(score) => *score += contribution,
            None => {
                scores.insert(result.id, contribution);
                order.push(result.id);
            }
        }
    }
}
