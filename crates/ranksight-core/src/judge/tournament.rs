//! Round-robin pairwise tournament with position-bias control.
//!
//! # Algorithm
//!
//! For every unordered pair `(a, b)` of candidates, in candidate order:
//!
//! 1. Ask the judge `compare(q, a, b)` (run 1)
//! 2. Ask again with the order swapped, `compare(q, b, a)` (run 2), and map
//!    the answer back onto `(a, b)`
//! 3. If both runs name the same winner (or both tie), keep it with run 1's
//!    reasoning; otherwise record a tie flagged as position bias
//! 4. Store the result under the canonical [`PairKey`] orientation
//!
//! `n` candidates cost exactly `n * (n - 1)` judge calls.
//!
//! # Failure isolation
//!
//! A [`JudgeError`] on either run abandons that pair only. Failed pairs are
//! counted in [`TournamentReport::failed_pairs`] and never retried.

use super::types::{Judgment, PairKey, ProjectProfile, Verdict, Winner};
use super::Judge;
use crate::error::JudgeError;
use crate::search::types::{ProjectId, QueryId};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Tournament tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TournamentConfig {
    /// Maximum pairs judged at once. Results keep pair order regardless.
    pub concurrency: usize,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self { concurrency: 1 }
    }
}

/// Outcome of one tournament.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentReport {
    /// One judgment per successfully judged pair, in pair order
    pub judgments: Vec<Judgment>,
    /// Pairs the tournament tried to judge
    pub pairs_attempted: usize,
    /// Pairs abandoned because a judge call failed
    pub failed_pairs: usize,
    /// Judgments that are ties caused by run disagreement
    pub position_bias_ties: usize,
    /// Judge calls actually issued
    pub judge_calls: usize,
}

impl TournamentReport {
    /// Folds another report into this one.
    pub fn merge(&mut self, other: TournamentReport) {
        self.judgments.extend(other.judgments);
        self.pairs_attempted += other.pairs_attempted;
        self.failed_pairs += other.failed_pairs;
        self.position_bias_ties += other.position_bias_ties;
        self.judge_calls += other.judge_calls;
    }
}

struct PairOutcome {
    result: Result<Judgment, JudgeError>,
    calls: usize,
}

/// Runs pairwise tournaments against a [`Judge`].
pub struct PairwiseTournament<'a> {
    judge: &'a dyn Judge,
    config: TournamentConfig,
}

impl<'a> PairwiseTournament<'a> {
    /// Creates a sequential tournament runner.
    pub fn new(judge: &'a dyn Judge) -> Self {
        Self::with_config(judge, TournamentConfig::default())
    }

    /// Creates a tournament runner with explicit settings.
    pub fn with_config(judge: &'a dyn Judge, config: TournamentConfig) -> Self {
        Self { judge, config }
    }

    /// Judges every pair of `candidates` for one query.
    ///
    /// Duplicate candidate ids are dropped (first kept). Fewer than two
    /// distinct candidates is a no-op that returns an empty report.
    pub async fn run(
        &self,
        query_id: QueryId,
        query_text: &str,
        candidates: &[ProjectProfile],
    ) -> TournamentReport {
        let candidates = dedup_candidates(query_id, candidates);
        if candidates.len() < 2 {
            debug!(
                "Query {}: {} distinct candidate(s), nothing to judge",
                query_id,
                candidates.len()
            );
            return TournamentReport::default();
        }

        let pairs: Vec<(&ProjectProfile, &ProjectProfile)> = candidates
            .iter()
            .enumerate()
            .flat_map(|(i, a)| candidates[i + 1..].iter().map(move |b| (*a, *b)))
            .collect();

        let mut report = TournamentReport {
            pairs_attempted: pairs.len(),
            ..Default::default()
        };

        let outcomes: Vec<PairOutcome> = stream::iter(pairs)
            .map(|(a, b)| self.judge_pair(query_id, query_text, a, b))
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            report.judge_calls += outcome.calls;
            match outcome.result {
                Ok(judgment) => {
                    if judgment.position_bias {
                        report.position_bias_ties += 1;
                    }
                    report.judgments.push(judgment);
                }
                Err(_) => report.failed_pairs += 1,
            }
        }

        info!(
            "Query {}: judged {}/{} pairs ({} position-bias ties, {} failed, {} calls)",
            query_id,
            report.judgments.len(),
            report.pairs_attempted,
            report.position_bias_ties,
            report.failed_pairs,
            report.judge_calls
        );

        report
    }

    async fn judge_pair(
        &self,
        query_id: QueryId,
        query_text: &str,
        a: &ProjectProfile,
        b: &ProjectProfile,
    ) -> PairOutcome {
        let first = match self.judge.compare(query_text, a, b).await {
            Ok(c) => c,
            Err(e) => return failed_pair(query_id, a.id, b.id, e, 1),
        };
        let second = match self.judge.compare(query_text, b, a).await {
            Ok(c) => c,
            Err(e) => return failed_pair(query_id, a.id, b.id, e, 2),
        };

        // Both winners are expressed relative to (a, b)
        let run1 = match first.verdict {
            Verdict::Left => Winner::A,
            Verdict::Right => Winner::B,
            Verdict::Tie => Winner::Tie,
        };
        let run2 = match second.verdict {
            Verdict::Left => Winner::B,
            Verdict::Right => Winner::A,
            Verdict::Tie => Winner::Tie,
        };

        // Re-express both runs in the stored orientation (A = smaller id)
        let (key, swapped) = PairKey::new(a.id, b.id);
        let (run1, run2) = if swapped {
            (run1.swapped(), run2.swapped())
        } else {
            (run1, run2)
        };

        let (winner, reasoning, position_bias) = if run1 == run2 {
            (run1, first.reasoning, false)
        } else {
            debug!(
                "Query {}: position bias on {} vs {} (run1={}, run2={})",
                query_id,
                key.a(),
                key.b(),
                run1,
                run2
            );
            (
                Winner::Tie,
                format!("Position bias: run1={}, run2={}", run1, run2),
                true,
            )
        };

        PairOutcome {
            result: Ok(Judgment {
                query_id,
                item_a_id: key.a(),
                item_b_id: key.b(),
                winner,
                reasoning,
                evidence_model: self.judge.model_id().to_string(),
                position_bias,
            }),
            calls: 2,
        }
    }
}

fn failed_pair(
    query_id: QueryId,
    a: ProjectId,
    b: ProjectId,
    err: JudgeError,
    calls: usize,
) -> PairOutcome {
    warn!(
        "Query {}: error comparing {} vs {}: {} (skipping pair)",
        query_id, a, b, err
    );
    PairOutcome {
        result: Err(err),
        calls,
    }
}

fn dedup_candidates(query_id: QueryId, candidates: &[ProjectProfile]) -> Vec<&ProjectProfile> {
    let mut seen = HashSet::with_capacity(candidates.len());
    let mut unique = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if seen.insert(candidate.id) {
            unique.push(candidate);
        } else {
            warn!(
                "Query {}: duplicate candidate {} dropped",
                query_id, candidate.id
            );
        }
    }
    unique
}
