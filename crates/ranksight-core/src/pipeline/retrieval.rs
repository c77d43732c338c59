use super::progress::{ProgressTimer, RunProgress};
use crate::config::{DEFAULT_HIT_RATE_KS, PROGRESS_LOG_INTERVAL, TOP_K_RETRIEVAL};
use crate::error::PipelineError;
use crate::evaluation::{EvaluationOutcome, RetrievalSummary, RetrievalTally};
use crate::search::{ranked_ids, HybridRetriever};
use crate::storage::EvalStore;
use tracing::{info, warn};

/// Settings for a retrieval run.
#[derive(Debug, Clone)]
pub struct RetrievalRunConfig {
    /// Results requested per query
    pub top_k: usize,
    /// Skip queries that already have a stored outcome
    pub skip_existing: bool,
    /// Hit-rate cutoffs to track
    pub hit_rate_ks: Vec<usize>,
}

impl Default for RetrievalRunConfig {
    fn default() -> Self {
        Self {
            top_k: TOP_K_RETRIEVAL,
            skip_existing: true,
            hit_rate_ks: DEFAULT_HIT_RATE_KS.to_vec(),
        }
    }
}

/// Result of a retrieval run.
#[derive(Debug, Clone)]
pub struct RetrievalRunReport {
    /// Queries selected for this run
    pub queries: usize,
    /// Outcomes and failures recorded during the run
    pub tally: RetrievalTally,
    /// Wall-clock duration (milliseconds)
    pub elapsed_ms: u64,
}

impl RetrievalRunReport {
    /// Metrics over the queries scored in this run.
    pub fn summary(&self) -> RetrievalSummary {
        self.tally.summary()
    }
}

/// Runs evaluation queries through the retriever and stores scored outcomes.
///
/// # Example
///
/// ```ignore
/// let runner = RetrievalRunner::new(&store, &retriever);
/// let report = runner.run(&RetrievalRunConfig::default(), |p| {
///     println!("{:.0}%", p.percent_complete())
/// }).await?;
/// println!("{}", report.summary().format_line());
/// ```
pub struct RetrievalRunner<'a> {
    store: &'a dyn EvalStore,
    retriever: &'a HybridRetriever,
}

impl<'a> RetrievalRunner<'a> {
    /// Creates a runner over a store and a retriever.
    pub fn new(store: &'a dyn EvalStore, retriever: &'a HybridRetriever) -> Self {
        Self { store, retriever }
    }

    /// Evaluates the selected queries.
    ///
    /// A failed search is logged, counted, and skipped. Store failures and an
    /// unconfigured search channel abort the run.
    ///
    /// # Arguments
    ///
    /// * `config` - Run settings
    /// * `on_progress` - Callback invoked after every query
    pub async fn run<F>(
        &self,
        config: &RetrievalRunConfig,
        mut on_progress: F,
    ) -> Result<RetrievalRunReport, PipelineError>
    where
        F: FnMut(RunProgress),
    {
        if config.top_k == 0 {
            return Err(PipelineError::InvalidConfig(
                "top_k must be greater than 0".to_string(),
            ));
        }

        let timer = ProgressTimer::new();
        let queries = if config.skip_existing {
            self.store.unevaluated_queries().await?
        } else {
            self.store.list_queries().await?
        };
        let total = queries.len();
        let mut tally = RetrievalTally::new(&config.hit_rate_ks);

        info!(
            "Evaluating {} queries ({} mode, top-{})",
            total,
            self.retriever.mode(),
            config.top_k
        );

        for (i, query) in queries.iter().enumerate() {
            match self
                .retriever
                .retrieve(&query.query_text, &query.filters, config.top_k)
                .await
            {
                Ok(results) => {
                    let outcome = EvaluationOutcome::score(
                        query.query_id,
                        ranked_ids(&results),
                        query.ground_truth_id,
                    );
                    self.store.put_outcome(&outcome).await?;
                    tally.record_outcome(&outcome);
                }
                Err(e) if e.is_fatal() => return Err(e.into()),
                Err(e) => {
                    warn!("Error evaluating query {}: {}", query.query_id, e);
                    tally.record_error();
                }
            }

            let done = i + 1;
            if done % PROGRESS_LOG_INTERVAL == 0 {
                info!(
                    "{}/{} - MRR: {:.4}, Hit Rate: {:.2}%",
                    done,
                    total,
                    tally.running_mrr().unwrap_or(0.0),
                    tally.running_hit_rate().unwrap_or(0.0) * 100.0
                );
            }

            on_progress(
                RunProgress::new(done, total, tally.errors(), timer.elapsed_ms())
                    .with_current(query.query_id),
            );
        }

        let report = RetrievalRunReport {
            queries: total,
            tally,
            elapsed_ms: timer.elapsed_ms(),
        };

        info!(
            "Evaluation complete: {} evaluated, {} errors, {}",
            report.tally.evaluated(),
            report.tally.errors(),
            report.summary().format_line()
        );

        Ok(report)
    }
}
