//! Evaluation store trait and in-memory implementation.
//!
//! The store holds everything a multi-stage evaluation run needs to survive
//! restarts: the project profiles shown to the judge, the evaluation queries,
//! one retrieval outcome per query, pairwise judgments, and the derived
//! preference scores.
//!
//! Every record is keyed by its natural id (`query_id`, project id, or the
//! canonical pair), so writing the same record twice is an upsert and the
//! runners can skip work that already exists.

use crate::evaluation::EvaluationOutcome;
use crate::judge::types::{Judgment, PairKey, ProjectProfile};
use crate::preference::PreferenceScore;
use crate::search::types::{ProjectId, QueryId, SearchFilters};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::RwLock;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Database error (redb, lock poisoning)
    #[error("Database error: {0}")]
    DatabaseError(String),
}

fn default_query_type() -> String {
    "synthetic".to_string()
}

/// One evaluation query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvalQuery {
    /// Stable identifier, also the idempotency key for every stage
    pub query_id: QueryId,
    /// Text sent to the search channels and the judge
    pub query_text: String,
    /// Free-form query kind (e.g. "skill_focused", "real")
    #[serde(default = "default_query_type")]
    pub query_type: String,
    /// Known-correct project, if any
    #[serde(default)]
    pub ground_truth_id: Option<ProjectId>,
    /// Grouping label for per-group metrics (e.g. industry)
    #[serde(default)]
    pub category: Option<String>,
    /// Filters passed through to the search channels
    #[serde(default)]
    pub filters: SearchFilters,
}

impl EvalQuery {
    /// Creates a query with default type, no ground truth, and no filters.
    pub fn new(query_id: QueryId, query_text: impl Into<String>) -> Self {
        Self {
            query_id,
            query_text: query_text.into(),
            query_type: default_query_type(),
            ground_truth_id: None,
            category: None,
            filters: SearchFilters::default(),
        }
    }

    /// Sets the ground truth project.
    pub fn with_ground_truth(mut self, id: ProjectId) -> Self {
        self.ground_truth_id = Some(id);
        self
    }

    /// Sets the grouping label.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Persistence for evaluation runs.
///
/// # Design Notes
///
/// - Outcomes and judgments are only ever added or overwritten, never
///   partially updated.
/// - Preferences are derived data: callers clear them before recomputing.
/// - Listing methods return records ordered by key.
#[async_trait::async_trait(?Send)]
pub trait EvalStore {
    // =========================================================================
    // Projects
    // =========================================================================

    /// Stores a project profile, replacing any existing one with the same id.
    async fn put_project(&self, project: &ProjectProfile) -> Result<(), StoreError>;

    /// Retrieves a project profile. Returns `Ok(None)` if absent.
    async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectProfile>, StoreError>;

    // =========================================================================
    // Queries
    // =========================================================================

    /// Stores a query, replacing any existing one with the same id.
    async fn put_query(&self, query: &EvalQuery) -> Result<(), StoreError>;

    /// Returns all queries ordered by id.
    async fn list_queries(&self) -> Result<Vec<EvalQuery>, StoreError>;

    // =========================================================================
    // Retrieval outcomes
    // =========================================================================

    /// Stores the outcome for `outcome.query_id`.
    async fn put_outcome(&self, outcome: &EvaluationOutcome) -> Result<(), StoreError>;

    /// Retrieves the outcome for a query. Returns `Ok(None)` if absent.
    async fn get_outcome(&self, id: QueryId) -> Result<Option<EvaluationOutcome>, StoreError>;

    /// Returns all outcomes ordered by query id.
    async fn list_outcomes(&self) -> Result<Vec<EvaluationOutcome>, StoreError>;

    // =========================================================================
    // Judgments
    // =========================================================================

    /// Stores a judgment under its query and canonical pair.
    async fn put_judgment(&self, judgment: &Judgment) -> Result<(), StoreError>;

    /// Returns the judgments for one query ordered by pair.
    async fn judgments_for(&self, id: QueryId) -> Result<Vec<Judgment>, StoreError>;

    /// Returns the ids of queries with at least one judgment.
    async fn judged_query_ids(&self) -> Result<BTreeSet<QueryId>, StoreError>;

    // =========================================================================
    // Preferences
    // =========================================================================

    /// Removes every stored preference score.
    async fn clear_preferences(&self) -> Result<(), StoreError>;

    /// Stores a preference score under its query and item.
    async fn put_preference(&self, score: &PreferenceScore) -> Result<(), StoreError>;

    /// Returns all preference scores ordered by query id, then item id.
    async fn list_preferences(&self) -> Result<Vec<PreferenceScore>, StoreError>;

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Removes all data.
    async fn clear(&self) -> Result<(), StoreError>;

    // =========================================================================
    // Provided: resumability
    // =========================================================================

    /// Queries that have no retrieval outcome yet.
    async fn unevaluated_queries(&self) -> Result<Vec<EvalQuery>, StoreError> {
        let evaluated: BTreeSet<QueryId> = self
            .list_outcomes()
            .await?
            .into_iter()
            .map(|o| o.query_id)
            .collect();
        Ok(self
            .list_queries()
            .await?
            .into_iter()
            .filter(|q| !evaluated.contains(&q.query_id))
            .collect())
    }

    /// Evaluated queries that have no judgments yet, paired with their outcome.
    async fn unjudged_queries(&self) -> Result<Vec<(EvalQuery, EvaluationOutcome)>, StoreError> {
        let judged = self.judged_query_ids().await?;
        let mut outcomes: BTreeMap<QueryId, EvaluationOutcome> = self
            .list_outcomes()
            .await?
            .into_iter()
            .map(|o| (o.query_id, o))
            .collect();

        Ok(self
            .list_queries()
            .await?
            .into_iter()
            .filter(|q| !judged.contains(&q.query_id))
            .filter_map(|q| outcomes.remove(&q.query_id).map(|o| (q, o)))
            .collect())
    }
}

/// In-memory evaluation store for tests and dry runs.
#[derive(Default)]
pub struct InMemoryEvalStore {
    projects: RwLock<BTreeMap<ProjectId, ProjectProfile>>,
    queries: RwLock<BTreeMap<QueryId, EvalQuery>>,
    outcomes: RwLock<BTreeMap<QueryId, EvaluationOutcome>>,
    judgments: RwLock<BTreeMap<(QueryId, PairKey), Judgment>>,
    preferences: RwLock<BTreeMap<(QueryId, ProjectId), PreferenceScore>>,
}

impl InMemoryEvalStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StoreError {
    StoreError::DatabaseError(format!("Lock poisoned: {}", e))
}

#[async_trait::async_trait(?Send)]
impl EvalStore for InMemoryEvalStore {
    async fn put_project(&self, project: &ProjectProfile) -> Result<(), StoreError> {
        let mut projects = self.projects.write().map_err(poisoned)?;
        projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectProfile>, StoreError> {
        let projects = self.projects.read().map_err(poisoned)?;
        Ok(projects.get(&id).cloned())
    }

    async fn put_query(&self, query: &EvalQuery) -> Result<(), StoreError> {
        let mut queries = self.queries.write().map_err(poisoned)?;
        queries.insert(query.query_id, query.clone());
        Ok(())
    }

    async fn list_queries(&self) -> Result<Vec<EvalQuery>, StoreError> {
        let queries = self.queries.read().map_err(poisoned)?;
        Ok(queries.values().cloned().collect())
    }

    async fn put_outcome(&self, outcome: &EvaluationOutcome) -> Result<(), StoreError> {
        let mut outcomes = self.outcomes.write().map_err(poisoned)?;
        outcomes.insert(outcome.query_id, outcome.clone());
        Ok(())
    }

    async fn get_outcome(&self, id: QueryId) -> Result<Option<EvaluationOutcome>, StoreError> {
        let outcomes = self.outcomes.read().map_err(poisoned)?;
        Ok(outcomes.get(&id).cloned())
    }

    async fn list_outcomes(&self) -> Result<Vec<EvaluationOutcome>, StoreError> {
        let outcomes = self.outcomes.read().map_err(poisoned)?;
        Ok(outcomes.values().cloned().collect())
    }

    async fn put_judgment(&self, judgment: &Judgment) -> Result<(), StoreError> {
        let mut judgments = self.judgments.write().map_err(poisoned)?;
        judgments.insert((judgment.query_id, judgment.pair()), judgment.clone());
        Ok(())
    }

    async fn judgments_for(&self, id: QueryId) -> Result<Vec<Judgment>, StoreError> {
        let judgments = self.judgments.read().map_err(poisoned)?;
        Ok(judgments
            .iter()
            .filter(|((q, _), _)| *q == id)
            .map(|(_, j)| j.clone())
            .collect())
    }

    async fn judged_query_ids(&self) -> Result<BTreeSet<QueryId>, StoreError> {
        let judgments = self.judgments.read().map_err(poisoned)?;
        Ok(judgments.keys().map(|(q, _)| *q).collect())
    }

    async fn clear_preferences(&self) -> Result<(), StoreError> {
        self.preferences.write().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn put_preference(&self, score: &PreferenceScore) -> Result<(), StoreError> {
        let mut preferences = self.preferences.write().map_err(poisoned)?;
        preferences.insert((score.query_id, score.item_id), score.clone());
        Ok(())
    }

    async fn list_preferences(&self) -> Result<Vec<PreferenceScore>, StoreError> {
        let preferences = self.preferences.read().map_err(poisoned)?;
        Ok(preferences.values().cloned().collect())
    }

    async fn clear(&self) -> Result<(), StoreError> {
        self.projects.write().map_err(poisoned)?.clear();
        self.queries.write().map_err(poisoned)?.clear();
        self.outcomes.write().map_err(poisoned)?.clear();
        self.judgments.write().map_err(poisoned)?.clear();
        self.preferences.write().map_err(poisoned)?.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::types::Winner;

    fn pid(id: u64) -> ProjectId {
        ProjectId::from_u64(id)
    }

    fn qid(id: u64) -> QueryId {
        QueryId::from_u64(id)
    }

    fn judgment(q: u64, a: u64, b: u64, winner: Winner) -> Judgment {
        Judgment {
            query_id: qid(q),
            item_a_id: pid(a),
            item_b_id: pid(b),
            winner,
            reasoning: "r".to_string(),
            evidence_model: "m".to_string(),
            position_bias: false,
        }
    }

    #[tokio::test]
    async fn test_project_roundtrip() {
        let store = InMemoryEvalStore::new();
        assert!(store.get_project(pid(1)).await.unwrap().is_none());

        let mut p = ProjectProfile::new(pid(1));
        p.skills = vec!["Rust".to_string()];
        store.put_project(&p).await.unwrap();
        assert_eq!(store.get_project(pid(1)).await.unwrap(), Some(p));
    }

    #[tokio::test]
    async fn test_resumability_helpers() {
        let store = InMemoryEvalStore::new();
        for i in 1..=3 {
            store
                .put_query(&EvalQuery::new(qid(i), format!("q{}", i)))
                .await
                .unwrap();
        }

        let pending: Vec<u64> = store
            .unevaluated_queries()
            .await
            .unwrap()
            .iter()
            .map(|q| q.query_id.as_u64())
            .collect();
        assert_eq!(pending, vec![1, 2, 3]);

        for i in [1, 2] {
            store
                .put_outcome(&EvaluationOutcome::score(qid(i), vec![pid(1), pid(2)], None))
                .await
                .unwrap();
        }
        let pending = store.unevaluated_queries().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].query_id, qid(3));

        store
            .put_judgment(&judgment(1, 1, 2, Winner::A))
            .await
            .unwrap();
        let unjudged = store.unjudged_queries().await.unwrap();
        assert_eq!(unjudged.len(), 1);
        assert_eq!(unjudged[0].0.query_id, qid(2));
        assert_eq!(unjudged[0].1.query_id, qid(2));
    }

    #[tokio::test]
    async fn test_judgment_upsert_by_pair() {
        let store = InMemoryEvalStore::new();
        store
            .put_judgment(&judgment(1, 1, 2, Winner::A))
            .await
            .unwrap();
        store
            .put_judgment(&judgment(1, 1, 2, Winner::B))
            .await
            .unwrap();
        store
            .put_judgment(&judgment(2, 1, 2, Winner::Tie))
            .await
            .unwrap();

        let for_one = store.judgments_for(qid(1)).await.unwrap();
        assert_eq!(for_one.len(), 1);
        assert_eq!(for_one[0].winner, Winner::B);

        let judged: Vec<QueryId> = store.judged_query_ids().await.unwrap().into_iter().collect();
        assert_eq!(judged, vec![qid(1), qid(2)]);
    }

    #[tokio::test]
    async fn test_clear_preferences_only() {
        let store = InMemoryEvalStore::new();
        store.put_query(&EvalQuery::new(qid(1), "q")).await.unwrap();
        store
            .put_preference(&PreferenceScore {
                query_id: qid(1),
                item_id: pid(5),
                score: 1.0,
                wins: 1.0,
                comparisons: 1,
                retrieval_rank: Some(1),
            })
            .await
            .unwrap();
        assert_eq!(store.list_preferences().await.unwrap().len(), 1);

        store.clear_preferences().await.unwrap();
        assert!(store.list_preferences().await.unwrap().is_empty());
        assert_eq!(store.list_queries().await.unwrap().len(), 1);

        store.clear().await.unwrap();
        assert!(store.list_queries().await.unwrap().is_empty());
    }
}
