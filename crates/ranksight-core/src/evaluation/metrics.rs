//! Per-query retrieval scoring.
//!
//! Each evaluation query has at most one known-correct project (the ground
//! truth). A query is scored by where that project first appears in the
//! retrieved list.
//!
//! # Formula
//!
//! ```text
//! rank = 1-indexed position of the first occurrence of the ground truth
//! RR   = 1 / rank        (0.0 when the ground truth is absent)
//! ```
//!
//! # References
//!
//! - Voorhees (1999). "The TREC-8 Question Answering Track Report"

use crate::search::types::{ProjectId, QueryId};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::warn;

/// Scored result of running one evaluation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationOutcome {
    /// Query this outcome belongs to
    pub query_id: QueryId,
    /// Retrieved project ids, most relevant first
    pub retrieved_ids: Vec<ProjectId>,
    /// Known-correct project, if the query has one
    pub ground_truth_id: Option<ProjectId>,
    /// 1-indexed position of the ground truth, None on a miss
    pub rank: Option<usize>,
    /// `1 / rank`, or 0.0 on a miss
    pub reciprocal_rank: f64,
}

impl EvaluationOutcome {
    /// Scores a retrieved list and builds the outcome.
    pub fn score(
        query_id: QueryId,
        retrieved_ids: Vec<ProjectId>,
        ground_truth_id: Option<ProjectId>,
    ) -> Self {
        let (rank, reciprocal_rank) = score_one(&retrieved_ids, ground_truth_id);
        Self {
            query_id,
            retrieved_ids,
            ground_truth_id,
            rank,
            reciprocal_rank,
        }
    }

    /// Returns true if the ground truth was retrieved at any rank.
    pub fn is_hit(&self) -> bool {
        self.rank.is_some()
    }

    /// Returns true if the ground truth was retrieved within the top `k`.
    pub fn hit_at(&self, k: usize) -> bool {
        self.rank.is_some_and(|rank| rank <= k)
    }

    /// Returns true if the query has a ground truth that missed the top `cutoff`.
    ///
    /// Queries without a ground truth are never failures.
    pub fn is_failure(&self, cutoff: usize) -> bool {
        self.ground_truth_id.is_some() && !self.hit_at(cutoff)
    }
}

/// Computes the rank and reciprocal rank of the ground truth.
///
/// # Arguments
///
/// * `retrieved_ids` - Retrieved project ids, most relevant first
/// * `ground_truth_id` - Known-correct project, or None for queries without one
///
/// # Returns
///
/// `(Some(p), 1/p)` where `p` is the 1-indexed first occurrence of the ground
/// truth, otherwise `(None, 0.0)`. A list with repeated ids is scored anyway;
/// the repetition is logged.
///
/// # Example
///
/// ```
/// use ranksight_core::evaluation::score_one;
/// use ranksight_core::search::ProjectId;
///
/// let ids: Vec<ProjectId> = [5, 8, 3, 9].into_iter().map(ProjectId::from_u64).collect();
/// let (rank, rr) = score_one(&ids, Some(ProjectId::from_u64(3)));
/// assert_eq!(rank, Some(3));
/// assert!((rr - 1.0 / 3.0).abs() < 1e-12);
/// ```
pub fn score_one(
    retrieved_ids: &[ProjectId],
    ground_truth_id: Option<ProjectId>,
) -> (Option<usize>, f64) {
    if has_duplicates(retrieved_ids) {
        warn!(
            "Retrieved list of {} ids contains duplicates; scoring first occurrence",
            retrieved_ids.len()
        );
    }

    let Some(truth) = ground_truth_id else {
        return (None, 0.0);
    };

    match retrieved_ids.iter().position(|id| *id == truth) {
        Some(index) => {
            let rank = index + 1;
            (Some(rank), 1.0 / rank as f64)
        }
        None => (None, 0.0),
    }
}

fn has_duplicates(ids: &[ProjectId]) -> bool {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().any(|id| !seen.insert(*id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pids(ids: &[u64]) -> Vec<ProjectId> {
        ids.iter().copied().map(ProjectId::from_u64).collect()
    }

    #[test]
    fn test_hit_at_third_position() {
        let (rank, rr) = score_one(&pids(&[5, 8, 3, 9]), Some(ProjectId::from_u64(3)));
        assert_eq!(rank, Some(3));
        assert!((rr - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_hit_at_first_position() {
        let (rank, rr) = score_one(&pids(&[7, 1]), Some(ProjectId::from_u64(7)));
        assert_eq!(rank, Some(1));
        assert_eq!(rr, 1.0);
    }

    #[test]
    fn test_miss() {
        assert_eq!(
            score_one(&pids(&[1, 2, 3]), Some(ProjectId::from_u64(42))),
            (None, 0.0)
        );
        assert_eq!(score_one(&[], Some(ProjectId::from_u64(42))), (None, 0.0));
    }

    #[test]
    fn test_no_ground_truth_is_a_miss() {
        assert_eq!(score_one(&pids(&[1, 2, 3]), None), (None, 0.0));
    }

    #[test]
    fn test_duplicates_use_first_occurrence() {
        let (rank, rr) = score_one(&pids(&[4, 2, 4, 2]), Some(ProjectId::from_u64(2)));
        assert_eq!(rank, Some(2));
        assert!((rr - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rank_and_rr_agree_for_every_position() {
        let ids = pids(&(100..120).collect::<Vec<_>>());
        for (i, id) in ids.iter().enumerate() {
            let (rank, rr) = score_one(&ids, Some(*id));
            let p = rank.unwrap();
            assert_eq!(p, i + 1);
            assert!(p >= 1);
            assert!((rr - 1.0 / p as f64).abs() < 1e-12);
        }
    }

    #[test]
    fn test_outcome_hit_at() {
        let outcome = EvaluationOutcome::score(
            QueryId::from_u64(1),
            pids(&[5, 8, 3, 9]),
            Some(ProjectId::from_u64(3)),
        );
        assert!(outcome.is_hit());
        assert!(!outcome.hit_at(1));
        assert!(outcome.hit_at(3));
        assert!(outcome.hit_at(10));

        let miss = EvaluationOutcome::score(QueryId::from_u64(2), pids(&[1]), None);
        assert!(!miss.is_hit());
        assert!(!miss.hit_at(20));
    }

    #[test]
    fn test_failure_cases() {
        let deep = EvaluationOutcome::score(
            QueryId::from_u64(1),
            pids(&(1..=12).collect::<Vec<_>>()),
            Some(ProjectId::from_u64(11)),
        );
        assert!(deep.is_hit());
        assert!(deep.is_failure(10));
        assert!(!deep.is_failure(20));

        let unlabelled = EvaluationOutcome::score(QueryId::from_u64(2), pids(&[1]), None);
        assert!(!unlabelled.is_failure(10));
    }
}
