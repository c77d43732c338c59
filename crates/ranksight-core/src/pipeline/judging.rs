use super::progress::{ProgressTimer, RunProgress};
use crate::config::TOP_K_JUDGE;
use crate::error::PipelineError;
use crate::judge::{Judge, PairwiseTournament, TournamentConfig, TournamentReport};
use crate::storage::EvalStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Settings for a judging run.
#[derive(Debug, Clone)]
pub struct JudgingRunConfig {
    /// How many top retrieved projects enter each tournament
    pub top_k: usize,
    /// Cap on queries judged in this run (cost control)
    pub max_queries: Option<usize>,
    /// Tournament settings
    pub tournament: TournamentConfig,
}

impl Default for JudgingRunConfig {
    fn default() -> Self {
        Self {
            top_k: TOP_K_JUDGE,
            max_queries: None,
            tournament: TournamentConfig::default(),
        }
    }
}

/// Counters for a judging run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgingRunReport {
    /// Queries selected for this run
    pub queries: usize,
    /// Queries that reached the tournament
    pub queries_judged: usize,
    /// Queries with fewer than two loadable candidates
    pub queries_skipped: usize,
    /// Retrieved ids with no stored project profile
    pub missing_projects: usize,
    /// Judgments written to the store
    pub judgments_stored: usize,
    /// Pairs attempted across all tournaments
    pub pairs_attempted: usize,
    /// Pairs abandoned after a judge error
    pub failed_pairs: usize,
    /// Ties caused by position bias
    pub position_bias_ties: usize,
    /// Judge calls issued
    pub judge_calls: usize,
    /// Wall-clock duration (milliseconds)
    pub elapsed_ms: u64,
}

impl JudgingRunReport {
    fn absorb(&mut self, report: &TournamentReport) {
        self.pairs_attempted += report.pairs_attempted;
        self.failed_pairs += report.failed_pairs;
        self.position_bias_ties += report.position_bias_ties;
        self.judge_calls += report.judge_calls;
    }

    /// Fraction of stored judgments that are position-bias ties.
    pub fn position_bias_rate(&self) -> Option<f64> {
        (self.judgments_stored > 0)
            .then(|| self.position_bias_ties as f64 / self.judgments_stored as f64)
    }
}

/// Runs pairwise tournaments over the top results of evaluated queries.
pub struct JudgingRunner<'a> {
    store: &'a dyn EvalStore,
    judge: &'a dyn Judge,
}

impl<'a> JudgingRunner<'a> {
    /// Creates a runner over a store and a judge.
    pub fn new(store: &'a dyn EvalStore, judge: &'a dyn Judge) -> Self {
        Self { store, judge }
    }

    /// Judges every evaluated query that has no judgments yet.
    ///
    /// For each query the first `top_k` retrieved projects are loaded from
    /// the store; ids without a stored profile are dropped. Judgments are
    /// written as soon as each tournament finishes.
    pub async fn run<F>(
        &self,
        config: &JudgingRunConfig,
        mut on_progress: F,
    ) -> Result<JudgingRunReport, PipelineError>
    where
        F: FnMut(RunProgress),
    {
        if config.top_k < 2 {
            return Err(PipelineError::InvalidConfig(
                "judge top_k must be at least 2".to_string(),
            ));
        }

        let timer = ProgressTimer::new();
        let mut pending = self.store.unjudged_queries().await?;
        if let Some(max) = config.max_queries {
            pending.truncate(max);
        }

        let total = pending.len();
        let mut report = JudgingRunReport {
            queries: total,
            ..Default::default()
        };
        let tournament = PairwiseTournament::with_config(self.judge, config.tournament);

        info!(
            "Judging {} queries (top-{}, {} comparisons per query)",
            total,
            config.top_k,
            config.top_k * (config.top_k - 1) / 2
        );

        for (i, (query, outcome)) in pending.iter().enumerate() {
            let mut candidates = Vec::with_capacity(config.top_k);
            for id in outcome.retrieved_ids.iter().take(config.top_k) {
                match self.store.get_project(*id).await? {
                    Some(profile) => candidates.push(profile),
                    None => {
                        warn!("Query {}: project {} not found, skipping", query.query_id, id);
                        report.missing_projects += 1;
                    }
                }
            }

            if candidates.len() < 2 {
                debug!(
                    "Query {}: only {} candidate(s) available",
                    query.query_id,
                    candidates.len()
                );
                report.queries_skipped += 1;
            } else {
                let result = tournament
                    .run(query.query_id, &query.query_text, &candidates)
                    .await;
                for judgment in &result.judgments {
                    self.store.put_judgment(judgment).await?;
                }
                report.judgments_stored += result.judgments.len();
                report.queries_judged += 1;
                report.absorb(&result);
            }

            on_progress(
                RunProgress::new(i + 1, total, report.failed_pairs, timer.elapsed_ms())
                    .with_current(query.query_id),
            );
        }

        report.elapsed_ms = timer.elapsed_ms();
        info!(
            "Judging complete: {} queries judged, {} judgments, {} position-bias ties, {} failed pairs",
            report.queries_judged,
            report.judgments_stored,
            report.position_bias_ties,
            report.failed_pairs
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::EvaluationOutcome;
    use crate::judge::ProjectProfile;
    use crate::search::{ProjectId, QueryId};
    use crate::storage::{EvalQuery, InMemoryEvalStore};
    use crate::test_utils::ScriptedJudge;

    async fn store_with(query_id: u64, retrieved: &[u64], known_projects: &[u64]) -> InMemoryEvalStore {
        let store = InMemoryEvalStore::new();
        let q = QueryId::from_u64(query_id);
        store.put_query(&EvalQuery::new(q, "react fintech")).await.unwrap();
        store
            .put_outcome(&EvaluationOutcome::score(
                q,
                retrieved.iter().copied().map(ProjectId::from_u64).collect(),
                None,
            ))
            .await
            .unwrap();
        for &id in known_projects {
            store
                .put_project(&ProjectProfile::new(ProjectId::from_u64(id)))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_judges_top_k_and_stores() {
        let store = store_with(1, &[1, 2, 3, 4, 5], &[1, 2, 3, 4, 5]).await;
        let judge = ScriptedJudge::preferring(&[3, 1, 2]);

        let config = JudgingRunConfig {
            top_k: 3,
            ..Default::default()
        };
        let report = JudgingRunner::new(&store, &judge)
            .run(&config, |_| {})
            .await
            .unwrap();

        assert_eq!(report.queries_judged, 1);
        assert_eq!(report.judgments_stored, 3);
        assert_eq!(report.judge_calls, 6);
        assert_eq!(
            store.judgments_for(QueryId::from_u64(1)).await.unwrap().len(),
            3
        );

        // Already judged: a second run has nothing to do
        let again = JudgingRunner::new(&store, &judge)
            .run(&config, |_| {})
            .await
            .unwrap();
        assert_eq!(again.queries, 0);
        assert_eq!(judge.calls(), 6);
    }

    #[tokio::test]
    async fn test_missing_projects_are_dropped() {
        let store = store_with(1, &[1, 2, 3], &[1, 3]).await;
        let judge = ScriptedJudge::preferring(&[1]);

        let report = JudgingRunner::new(&store, &judge)
            .run(&JudgingRunConfig::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.missing_projects, 1);
        assert_eq!(report.judgments_stored, 1);
    }

    #[tokio::test]
    async fn test_too_few_candidates_skipped() {
        let store = store_with(1, &[1, 2], &[2]).await;
        let judge = ScriptedJudge::preferring(&[]);

        let report = JudgingRunner::new(&store, &judge)
            .run(&JudgingRunConfig::default(), |_| {})
            .await
            .unwrap();

        assert_eq!(report.queries_skipped, 1);
        assert_eq!(report.queries_judged, 0);
        assert_eq!(judge.calls(), 0);
    }

    #[tokio::test]
    async fn test_max_queries_caps_run() {
        let store = store_with(1, &[1, 2], &[1, 2]).await;
        store
            .put_query(&EvalQuery::new(QueryId::from_u64(2), "second"))
            .await
            .unwrap();
        store
            .put_outcome(&EvaluationOutcome::score(
                QueryId::from_u64(2),
                vec![ProjectId::from_u64(2), ProjectId::from_u64(1)],
                None,
            ))
            .await
            .unwrap();

        let judge = ScriptedJudge::always(crate::judge::Verdict::Left);
        let report = JudgingRunner::new(&store, &judge)
            .run(
                &JudgingRunConfig {
                    max_queries: Some(1),
                    ..Default::default()
                },
                |_| {},
            )
            .await
            .unwrap();

        assert_eq!(report.queries, 1);
        assert_eq!(report.position_bias_ties, 1);
        assert_eq!(report.position_bias_rate(), Some(1.0));
    }
}
