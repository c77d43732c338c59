//! Corpus-level retrieval metrics: MRR and Hit-rate@K.
//!
//! # Formulas
//!
//! ```text
//! MRR        = (1/N) Σ RR_i               (misses contribute 0)
//! HitRate@K  = |{ i : rank_i ≤ K }| / N
//! ```
//!
//! `N` counts evaluated queries only. Queries whose search call failed are
//! tallied separately by [`RetrievalTally`] and never enter the denominator.

use super::metrics::EvaluationOutcome;
use crate::config::DEFAULT_HIT_RATE_KS;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Aggregated retrieval metrics over a set of outcomes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSummary {
    /// Number of outcomes aggregated
    pub evaluated: usize,
    /// Outcomes whose ground truth appeared at any rank
    pub hits: usize,
    /// Mean reciprocal rank, None when nothing was evaluated
    pub mrr: Option<f64>,
    /// Hit rate for each requested cutoff; empty when nothing was evaluated
    pub hit_rate_at_k: BTreeMap<usize, f64>,
}

impl RetrievalSummary {
    /// Returns the hit rate for cutoff `k`, if it was computed.
    pub fn hit_rate(&self, k: usize) -> Option<f64> {
        self.hit_rate_at_k.get(&k).copied()
    }

    /// Formats MRR and hit rates as a single human-readable line.
    pub fn format_line(&self) -> String {
        let Some(mrr) = self.mrr else {
            return "no evaluated queries".to_string();
        };
        let rates: Vec<String> = self
            .hit_rate_at_k
            .iter()
            .map(|(k, rate)| format!("Hit@{}={:.1}%", k, rate * 100.0))
            .collect();
        format!(
            "MRR={:.4} ({} / {} hits) {}",
            mrr,
            self.hits,
            self.evaluated,
            rates.join(" ")
        )
    }
}

/// Aggregates outcomes into MRR and Hit-rate@K for each `k` in `ks`.
///
/// An empty `outcomes` slice yields `mrr: None` and no hit rates.
pub fn aggregate(outcomes: &[EvaluationOutcome], ks: &[usize]) -> RetrievalSummary {
    aggregate_iter(outcomes.iter(), ks)
}

/// Groups labelled outcomes and aggregates each group independently.
///
/// The per-group formulas are identical to [`aggregate`]; only the
/// denominator changes.
pub fn aggregate_by<L: Ord + Clone>(
    labelled: &[(L, EvaluationOutcome)],
    ks: &[usize],
) -> BTreeMap<L, RetrievalSummary> {
    let mut groups: BTreeMap<L, Vec<&EvaluationOutcome>> = BTreeMap::new();
    for (label, outcome) in labelled {
        groups.entry(label.clone()).or_default().push(outcome);
    }

    groups
        .into_iter()
        .map(|(label, members)| (label, aggregate_iter(members.into_iter(), ks)))
        .collect()
}

fn aggregate_iter<'a>(
    outcomes: impl Iterator<Item = &'a EvaluationOutcome>,
    ks: &[usize],
) -> RetrievalSummary {
    let mut evaluated = 0usize;
    let mut hits = 0usize;
    let mut rr_sum = 0.0f64;
    let mut hits_at: BTreeMap<usize, usize> = ks.iter().map(|&k| (k, 0)).collect();

    for outcome in outcomes {
        evaluated += 1;
        rr_sum += outcome.reciprocal_rank;
        if let Some(rank) = outcome.rank {
            hits += 1;
            for (k, count) in hits_at.iter_mut() {
                if rank <= *k {
                    *count += 1;
                }
            }
        }
    }

    if evaluated == 0 {
        return RetrievalSummary::default();
    }

    let n = evaluated as f64;
    RetrievalSummary {
        evaluated,
        hits,
        mrr: Some(rr_sum / n),
        hit_rate_at_k: hits_at
            .into_iter()
            .map(|(k, count)| (k, count as f64 / n))
            .collect(),
    }
}

/// Running accumulator for a retrieval run.
///
/// Outcomes and failed queries are recorded as they happen; the tally is
/// returned to the caller when the run ends.
#[derive(Debug, Clone)]
pub struct RetrievalTally {
    ks: Vec<usize>,
    evaluated: usize,
    hits: usize,
    rr_sum: f64,
    hits_at: BTreeMap<usize, usize>,
    errors: usize,
}

impl Default for RetrievalTally {
    fn default() -> Self {
        Self::new(DEFAULT_HIT_RATE_KS)
    }
}

impl RetrievalTally {
    /// Creates an empty tally tracking the given hit-rate cutoffs.
    pub fn new(ks: &[usize]) -> Self {
        Self {
            ks: ks.to_vec(),
            evaluated: 0,
            hits: 0,
            rr_sum: 0.0,
            hits_at: ks.iter().map(|&k| (k, 0)).collect(),
            errors: 0,
        }
    }

    /// Records a scored query.
    pub fn record_outcome(&mut self, outcome: &EvaluationOutcome) {
        self.evaluated += 1;
        self.rr_sum += outcome.reciprocal_rank;
        if let Some(rank) = outcome.rank {
            self.hits += 1;
            for (k, count) in self.hits_at.iter_mut() {
                if rank <= *k {
                    *count += 1;
                }
            }
        }
    }

    /// Records a query whose retrieval failed.
    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    /// Number of scored queries.
    pub fn evaluated(&self) -> usize {
        self.evaluated
    }

    /// Number of failed queries.
    pub fn errors(&self) -> usize {
        self.errors
    }

    /// Running MRR over scored queries.
    pub fn running_mrr(&self) -> Option<f64> {
        (self.evaluated > 0).then(|| self.rr_sum / self.evaluated as f64)
    }

    /// Running hit rate at any rank.
    pub fn running_hit_rate(&self) -> Option<f64> {
        (self.evaluated > 0).then(|| self.hits as f64 / self.evaluated as f64)
    }

    /// Snapshot of the metrics accumulated so far.
    pub fn summary(&self) -> RetrievalSummary {
        if self.evaluated == 0 {
            return RetrievalSummary::default();
        }
        let n = self.evaluated as f64;
        RetrievalSummary {
            evaluated: self.evaluated,
            hits: self.hits,
            mrr: Some(self.rr_sum / n),
            hit_rate_at_k: self
                .ks
                .iter()
                .map(|k| (*k, self.hits_at.get(k).copied().unwrap_or(0) as f64 / n))
                .collect(),
        }
    }
}
