use crate::error::PipelineError;
use crate::preference::{compute_preferences, rank_agreement};
use crate::search::types::QueryId;
use crate::storage::EvalStore;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Result of recomputing preference scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PreferenceRunReport {
    /// Queries with at least one judgment
    pub queries: usize,
    /// Preference scores written
    pub scores_written: usize,
    /// Spearman agreement with retrieval order, per query where defined
    pub rank_agreement: BTreeMap<QueryId, f64>,
}

impl PreferenceRunReport {
    /// Mean of the per-query rank agreements.
    pub fn mean_rank_agreement(&self) -> Option<f64> {
        if self.rank_agreement.is_empty() {
            return None;
        }
        Some(self.rank_agreement.values().sum::<f64>() / self.rank_agreement.len() as f64)
    }
}

/// Clears stored preference scores and recomputes them from judgments.
///
/// The retrieval order for each query is the stored outcome's retrieved ids.
/// A judged query with no stored outcome gets scores without retrieval ranks.
pub async fn recompute_preferences(
    store: &dyn EvalStore,
) -> Result<PreferenceRunReport, PipelineError> {
    store.clear_preferences().await?;

    let mut report = PreferenceRunReport::default();
    let judged = store.judged_query_ids().await?;
    if judged.is_empty() {
        info!("No judgments found");
        return Ok(report);
    }

    for query_id in judged {
        let judgments = store.judgments_for(query_id).await?;
        let retrieval_order = match store.get_outcome(query_id).await? {
            Some(outcome) => outcome.retrieved_ids,
            None => {
                warn!("Query {}: no retrieval outcome, ranks unavailable", query_id);
                Vec::new()
            }
        };

        let scores = compute_preferences(query_id, &judgments, &retrieval_order);
        for score in &scores {
            store.put_preference(score).await?;
        }

        if let Some(rho) = rank_agreement(&scores) {
            report.rank_agreement.insert(query_id, rho);
        }
        report.scores_written += scores.len();
        report.queries += 1;
    }

    info!(
        "Computed preference rankings for {} queries ({} scores)",
        report.queries, report.scores_written
    );

    Ok(report)
}
