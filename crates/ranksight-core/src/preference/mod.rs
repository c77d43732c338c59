//! Preference aggregation: from pairwise judgments to per-project win rates.
//!
//! # Scoring
//!
//! ```text
//! wins(item)        = Σ 1.0 per sole win + 0.5 per tie
//! comparisons(item) = number of judgments involving the item
//! score(item)       = wins / comparisons  ∈ [0, 1]
//! ```
//!
//! Each score is paired with the item's rank in the retrieval order so the
//! judge's preference can be compared with what the index returned.

use crate::evaluation::stats::spearman_correlation;
use crate::judge::types::{Judgment, Winner};
use crate::search::types::{ProjectId, QueryId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::warn;

/// Judge preference for one project under one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceScore {
    /// Query the preference belongs to
    pub query_id: QueryId,
    /// Project identifier
    pub item_id: ProjectId,
    /// `wins / comparisons`, in [0, 1]
    pub score: f64,
    /// Wins, counting ties as half
    pub wins: f64,
    /// Judgments that involved this item
    pub comparisons: usize,
    /// 1-indexed position in the retrieval order, if present
    pub retrieval_rank: Option<usize>,
}

impl PreferenceScore {
    /// Gap between the judge's win rate and the index's reciprocal rank.
    ///
    /// None when the item has no retrieval rank.
    pub fn disagreement(&self) -> Option<f64> {
        self.retrieval_rank
            .map(|rank| (self.score - 1.0 / rank as f64).abs())
    }
}

/// Computes per-item preference scores for one query.
///
/// Judgments for other queries are ignored (with a warning). The result is
/// sorted by score descending, then by retrieval rank with ranked items
/// first, then by id; it does not depend on the order of `judgments`.
pub fn compute_preferences(
    query_id: QueryId,
    judgments: &[Judgment],
    retrieval_order: &[ProjectId],
) -> Vec<PreferenceScore> {
    let mut tallies: HashMap<ProjectId, (f64, usize)> = HashMap::new();
    let mut foreign = 0usize;

    for judgment in judgments {
        if judgment.query_id != query_id {
            foreign += 1;
            continue;
        }

        let (a_win, b_win) = match judgment.winner {
            Winner::A => (1.0, 0.0),
            Winner::B => (0.0, 1.0),
            Winner::Tie => (0.5, 0.5),
        };
        for (item, credit) in [(judgment.item_a_id, a_win), (judgment.item_b_id, b_win)] {
            let entry = tallies.entry(item).or_insert((0.0, 0));
            entry.0 += credit;
            entry.1 += 1;
        }
    }

    if foreign > 0 {
        warn!(
            "Ignored {} judgment(s) not belonging to query {}",
            foreign, query_id
        );
    }

    let mut ranks: HashMap<ProjectId, usize> = HashMap::with_capacity(retrieval_order.len());
    for (i, id) in retrieval_order.iter().enumerate() {
        ranks.entry(*id).or_insert(i + 1);
    }

    let mut scores: Vec<PreferenceScore> = tallies
        .into_iter()
        .map(|(item_id, (wins, comparisons))| PreferenceScore {
            query_id,
            item_id,
            score: wins / comparisons as f64,
            wins,
            comparisons,
            retrieval_rank: ranks.get(&item_id).copied(),
        })
        .collect();

    scores.sort_by(compare_scores);
    scores
}

fn compare_scores(x: &PreferenceScore, y: &PreferenceScore) -> Ordering {
    y.score
        .partial_cmp(&x.score)
        .unwrap_or(Ordering::Equal)
        .then_with(|| match (x.retrieval_rank, y.retrieval_rank) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| x.item_id.cmp(&y.item_id))
}

/// Spearman correlation between judge preference and retrieval order.
///
/// Only items with a retrieval rank participate. A positive value means the
/// judge tends to prefer what the index ranked higher. Returns None for fewer
/// than two ranked items or when either side has no variance.
pub fn rank_agreement(scores: &[PreferenceScore]) -> Option<f64> {
    let (pref, rank): (Vec<f64>, Vec<f64>) = scores
        .iter()
        .filter_map(|s| s.retrieval_rank.map(|r| (s.score, -(r as f64))))
        .unzip();
    spearman_correlation(&pref, &rank)
}

/// Returns up to `n` scores where judge and index disagree most.
///
/// Disagreement is `|score - 1/retrieval_rank|`; unranked items are skipped.
pub fn largest_disagreements(scores: &[PreferenceScore], n: usize) -> Vec<&PreferenceScore> {
    let mut ranked: Vec<(&PreferenceScore, f64)> = scores
        .iter()
        .filter_map(|s| s.disagreement().map(|d| (s, d)))
        .collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.query_id.cmp(&b.0.query_id))
            .then_with(|| a.0.item_id.cmp(&b.0.item_id))
    });
    ranked.into_iter().take(n).map(|(s, _)| s).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: QueryId = QueryId::from_u64(1);

    fn pid(id: u64) -> ProjectId {
        ProjectId::from_u64(id)
    }

    fn judgment(a: u64, b: u64, winner: Winner) -> Judgment {
        Judgment {
            query_id: Q,
            item_a_id: pid(a),
            item_b_id: pid(b),
            winner,
            reasoning: String::new(),
            evidence_model: "test".to_string(),
            position_bias: false,
        }
    }

    fn order(ids: &[u64]) -> Vec<ProjectId> {
        ids.iter().copied().map(pid).collect()
    }

    fn find(scores: &[PreferenceScore], id: u64) -> &PreferenceScore {
        scores.iter().find(|s| s.item_id == pid(id)).unwrap()
    }

    #[test]
    fn test_empty_judgments() {
        assert!(compute_preferences(Q, &[], &order(&[1, 2])).is_empty());
    }

    #[test]
    fn test_win_loss_tie_credit() {
        let judgments = vec![
            judgment(1, 2, Winner::A),
            judgment(1, 3, Winner::Tie),
            judgment(2, 3, Winner::B),
        ];
        let scores = compute_preferences(Q, &judgments, &order(&[2, 1, 3]));

        let one = find(&scores, 1);
        assert_eq!(one.comparisons, 2);
        assert!((one.score - 0.75).abs() < 1e-12);
        assert_eq!(one.retrieval_rank, Some(2));

        let three = find(&scores, 3);
        assert!((three.score - 0.75).abs() < 1e-12);

        let two = find(&scores, 2);
        assert_eq!(two.score, 0.0);

        // 1 and 3 tie on score; 1 has the better retrieval rank
        let ids: Vec<u64> = scores.iter().map(|s| s.item_id.as_u64()).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_cyclic_case_all_half() {
        let judgments = vec![
            judgment(1, 2, Winner::A),
            judgment(2, 3, Winner::A),
            judgment(1, 3, Winner::B),
        ];
        let scores = compute_preferences(Q, &judgments, &order(&[1, 2, 3]));
        assert_eq!(scores.len(), 3);
        assert!(scores.iter().all(|s| (s.score - 0.5).abs() < 1e-12));
    }

    #[test]
    fn test_total_wins_equal_judgments_and_order_invariant() {
        let judgments = vec![
            judgment(1, 2, Winner::A),
            judgment(1, 3, Winner::Tie),
            judgment(2, 3, Winner::B),
            judgment(3, 4, Winner::A),
            judgment(1, 4, Winner::Tie),
        ];
        let forward = compute_preferences(Q, &judgments, &order(&[4, 3, 2, 1]));

        let mut reversed_input = judgments.clone();
        reversed_input.reverse();
        let reversed = compute_preferences(Q, &reversed_input, &order(&[4, 3, 2, 1]));

        assert_eq!(forward, reversed);
        let total: f64 = forward.iter().map(|s| s.wins).sum();
        assert!((total - judgments.len() as f64).abs() < 1e-12);
        assert!(forward.iter().all(|s| (0.0..=1.0).contains(&s.score)));
    }

    #[test]
    fn test_other_queries_ignored() {
        let mut foreign = judgment(1, 2, Winner::B);
        foreign.query_id = QueryId::from_u64(99);
        let scores = compute_preferences(Q, &[judgment(1, 2, Winner::A), foreign], &[]);

        assert_eq!(find(&scores, 1).score, 1.0);
        assert_eq!(find(&scores, 1).comparisons, 1);
    }

    #[test]
    fn test_unranked_items_sort_after_ranked() {
        let judgments = vec![judgment(1, 2, Winner::Tie), judgment(3, 4, Winner::Tie)];
        let scores = compute_preferences(Q, &judgments, &order(&[4, 2]));
        let ids: Vec<u64> = scores.iter().map(|s| s.item_id.as_u64()).collect();
        assert_eq!(ids, vec![4, 2, 1, 3]);
        assert_eq!(find(&scores, 1).retrieval_rank, None);
    }

    #[test]
    fn test_rank_agreement() {
        // Judge agrees perfectly with retrieval order 1 > 2 > 3
        let agree = compute_preferences(
            Q,
            &[
                judgment(1, 2, Winner::A),
                judgment(1, 3, Winner::A),
                judgment(2, 3, Winner::A),
            ],
            &order(&[1, 2, 3]),
        );
        assert!((rank_agreement(&agree).unwrap() - 1.0).abs() < 1e-12);

        // Judge reverses it
        let disagree = compute_preferences(
            Q,
            &[
                judgment(1, 2, Winner::B),
                judgment(1, 3, Winner::B),
                judgment(2, 3, Winner::B),
            ],
            &order(&[1, 2, 3]),
        );
        assert!((rank_agreement(&disagree).unwrap() + 1.0).abs() < 1e-12);

        // All ties: no variance on the preference side
        let flat = compute_preferences(Q, &[judgment(1, 2, Winner::Tie)], &order(&[1, 2]));
        assert_eq!(rank_agreement(&flat), None);
    }

    #[test]
    fn test_largest_disagreements() {
        let judgments = vec![
            judgment(1, 2, Winner::B),
            judgment(1, 3, Winner::B),
            judgment(2, 3, Winner::A),
        ];
        let scores = compute_preferences(Q, &judgments, &order(&[1, 2, 3]));
        // 1: score 0, rank 1 -> 1.0; 2: score 1, rank 2 -> 0.5; 3: score .5, rank 3 -> 1/6
        let top = largest_disagreements(&scores, 2);
        let ids: Vec<u64> = top.iter().map(|s| s.item_id.as_u64()).collect();
        assert_eq!(ids, vec![1, 2]);
        assert!((top[0].disagreement().unwrap() - 1.0).abs() < 1e-12);
    }
}
