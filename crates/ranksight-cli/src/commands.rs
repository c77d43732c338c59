//! Subcommand implementations.
//!
//! Each function reads what it needs from the store and returns a plain
//! report value; formatting is left to [`crate::output`].

use anyhow::{Context, Result};
use ranksight_core::config::{BOOTSTRAP_RESAMPLES, BOOTSTRAP_SEED, DEFAULT_HIT_RATE_KS};
use ranksight_core::evaluation::{
    aggregate, aggregate_by, bootstrap_ci, BootstrapResult, EvaluationOutcome, RetrievalSummary,
};
use ranksight_core::preference::{largest_disagreements, PreferenceScore};
use ranksight_core::search::{ProjectId, QueryId};
use ranksight_core::storage::{EvalQuery, EvalStore, RedbEvalStore};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use tracing::info;

/// Projects shown per query in the comparison report.
const COMPARISON_ROWS_PER_QUERY: usize = 5;

/// Disagreement rows fetched per requested query before grouping.
const COMPARISON_FETCH_FACTOR: usize = 3;

/// Label used when a query has no category.
const UNCATEGORIZED: &str = "uncategorized";

/// Opens (or creates) the evaluation database, creating parent directories.
pub fn open_store(db_path: &Path) -> Result<RedbEvalStore> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }
    }

    info!("Opening database: {}", db_path.display());
    RedbEvalStore::open(db_path)
        .with_context(|| format!("Failed to open database: {}", db_path.display()))
}

// =============================================================================
// Metrics
// =============================================================================

/// Stored retrieval metrics, overall and per group.
#[derive(Debug, Serialize)]
pub struct MetricsReport {
    pub overall: RetrievalSummary,
    /// 95% bootstrap interval for the overall MRR
    pub mrr_ci: Option<BootstrapResult>,
    pub by_query_type: BTreeMap<String, RetrievalSummary>,
    pub by_category: BTreeMap<String, RetrievalSummary>,
}

/// Aggregates every stored outcome.
pub async fn build_metrics(store: &dyn EvalStore) -> Result<MetricsReport> {
    let outcomes = store.list_outcomes().await?;
    let queries = queries_by_id(store).await?;

    let reciprocal_ranks: Vec<f64> = outcomes.iter().map(|o| o.reciprocal_rank).collect();

    let mut by_type = Vec::with_capacity(outcomes.len());
    let mut by_category = Vec::with_capacity(outcomes.len());
    for outcome in &outcomes {
        if let Some(query) = queries.get(&outcome.query_id) {
            by_type.push((query.query_type.clone(), outcome.clone()));
            let category = query.category.as_deref().unwrap_or(UNCATEGORIZED);
            by_category.push((category.to_string(), outcome.clone()));
        }
    }

    Ok(MetricsReport {
        overall: aggregate(&outcomes, DEFAULT_HIT_RATE_KS),
        mrr_ci: bootstrap_ci(&reciprocal_ranks, BOOTSTRAP_RESAMPLES, BOOTSTRAP_SEED),
        by_query_type: aggregate_by(&by_type, DEFAULT_HIT_RATE_KS),
        by_category: aggregate_by(&by_category, DEFAULT_HIT_RATE_KS),
    })
}

// =============================================================================
// Failures
// =============================================================================

/// A labelled query whose ground truth missed the top ranks.
#[derive(Debug, Serialize)]
pub struct FailureCase {
    pub query_id: QueryId,
    pub query_text: String,
    pub query_type: String,
    pub category: Option<String>,
    pub ground_truth_id: Option<ProjectId>,
    /// None when the ground truth was not retrieved at all
    pub rank: Option<usize>,
}

/// Lists up to `limit` failure cases in query id order.
pub async fn find_failures(
    store: &dyn EvalStore,
    cutoff: usize,
    limit: usize,
) -> Result<Vec<FailureCase>> {
    let queries = queries_by_id(store).await?;

    Ok(store
        .list_outcomes()
        .await?
        .into_iter()
        .filter(|o| o.is_failure(cutoff))
        .filter_map(|o| queries.get(&o.query_id).map(|q| failure_case(q, &o)))
        .take(limit)
        .collect())
}

fn failure_case(query: &EvalQuery, outcome: &EvaluationOutcome) -> FailureCase {
    FailureCase {
        query_id: query.query_id,
        query_text: query.query_text.clone(),
        query_type: query.query_type.clone(),
        category: query.category.clone(),
        ground_truth_id: outcome.ground_truth_id,
        rank: outcome.rank,
    }
}

// =============================================================================
// Ranking comparison
// =============================================================================

/// Judge preferences for one query next to the index's ranks.
#[derive(Debug, Serialize)]
pub struct ComparisonGroup {
    pub query_id: QueryId,
    pub query_text: String,
    /// Sorted by preference score, highest first
    pub rows: Vec<PreferenceScore>,
}

/// Groups the largest LLM-vs-index disagreements by query.
///
/// Queries appear in order of their largest disagreement; at most `n` are
/// returned.
pub async fn build_comparison(store: &dyn EvalStore, n: usize) -> Result<Vec<ComparisonGroup>> {
    let scores = store.list_preferences().await?;
    let queries = queries_by_id(store).await?;
    let top = largest_disagreements(&scores, n * COMPARISON_FETCH_FACTOR);

    let mut groups: Vec<ComparisonGroup> = Vec::new();
    for score in top {
        if let Some(group) = groups.iter_mut().find(|g| g.query_id == score.query_id) {
            group.rows.push(score.clone());
            continue;
        }
        if groups.len() == n {
            continue;
        }
        groups.push(ComparisonGroup {
            query_id: score.query_id,
            query_text: queries
                .get(&score.query_id)
                .map(|q| q.query_text.clone())
                .unwrap_or_default(),
            rows: vec![score.clone()],
        });
    }

    for group in &mut groups {
        group
            .rows
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        group.rows.truncate(COMPARISON_ROWS_PER_QUERY);
    }

    Ok(groups)
}

async fn queries_by_id(store: &dyn EvalStore) -> Result<HashMap<QueryId, EvalQuery>> {
    Ok(store
        .list_queries()
        .await?
        .into_iter()
        .map(|q| (q.query_id, q))
        .collect())
}
