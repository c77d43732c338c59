//! Redb-backed evaluation store.
//!
//! Uses [redb](https://github.com/cberner/redb) - a pure Rust, ACID-compliant,
//! embedded B-tree database. Values are JSON so that records stay readable
//! with generic tooling and tolerate added fields.
//!
//! # Tables
//!
//! - `projects`: ProjectId (u64) -> ProjectProfile (JSON)
//! - `queries`: QueryId (u64) -> EvalQuery (JSON)
//! - `outcomes`: QueryId (u64) -> EvaluationOutcome (JSON)
//! - `judgments`: (QueryId, item_a, item_b) -> Judgment (JSON)
//! - `preferences`: (QueryId, ProjectId) -> PreferenceScore (JSON)

use super::{EvalQuery, EvalStore, StoreError};
use crate::evaluation::EvaluationOutcome;
use crate::judge::types::{Judgment, ProjectProfile};
use crate::preference::PreferenceScore;
use crate::search::types::{ProjectId, QueryId};
use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

const PROJECTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("projects");
const QUERIES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("queries");
const OUTCOMES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("outcomes");
const JUDGMENTS_TABLE: TableDefinition<(u64, u64, u64), &[u8]> =
    TableDefinition::new("judgments");
const PREFERENCES_TABLE: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("preferences");

/// Redb-backed evaluation store.
///
/// Every write is its own transaction, so an interrupted run leaves all
/// completed queries and pairs on disk.
///
/// # Example
///
/// ```ignore
/// use ranksight_core::storage::{EvalStore, RedbEvalStore};
///
/// let store = RedbEvalStore::open("./data/ranksight.redb")?;
/// let pending = store.unevaluated_queries().await?;
/// ```
pub struct RedbEvalStore {
    db: Arc<Database>,
}

impl RedbEvalStore {
    /// Opens or creates a redb database at the given path.
    ///
    /// Creates the database file and all required tables if they don't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref())
            .map_err(|e| StoreError::DatabaseError(format!("Failed to open database: {}", e)))?;

        {
            let write_txn = db.begin_write().map_err(|e| {
                StoreError::DatabaseError(format!("Failed to begin write transaction: {}", e))
            })?;

            write_txn.open_table(PROJECTS_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to create projects table: {}", e))
            })?;
            write_txn.open_table(QUERIES_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to create queries table: {}", e))
            })?;
            write_txn.open_table(OUTCOMES_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to create outcomes table: {}", e))
            })?;
            write_txn.open_table(JUDGMENTS_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to create judgments table: {}", e))
            })?;
            write_txn.open_table(PREFERENCES_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to create preferences table: {}", e))
            })?;

            write_txn.commit().map_err(|e| {
                StoreError::DatabaseError(format!("Failed to commit table creation: {}", e))
            })?;
        }

        Ok(Self { db: Arc::new(db) })
    }

    fn serialize<T: Serialize>(value: &T, what: &str) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(value).map_err(|e| {
            StoreError::SerializationError(format!("Failed to serialize {}: {}", what, e))
        })
    }

    fn deserialize<T: DeserializeOwned>(bytes: &[u8], what: &str) -> Result<T, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| {
            StoreError::SerializationError(format!("Failed to deserialize {}: {}", what, e))
        })
    }

    /// Inserts one value into a u64-keyed table in its own transaction.
    fn insert_u64(
        &self,
        table_def: TableDefinition<u64, &'static [u8]>,
        key: u64,
        bytes: &[u8],
        what: &str,
    ) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin write transaction: {}", e))
        })?;
        {
            let mut table = write_txn.open_table(table_def).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to open {} table: {}", what, e))
            })?;
            table.insert(key, bytes).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to insert {}: {}", what, e))
            })?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::DatabaseError(format!("Failed to commit write: {}", e)))
    }

    /// Reads one value from a u64-keyed table.
    fn get_u64<T: DeserializeOwned>(
        &self,
        table_def: TableDefinition<u64, &'static [u8]>,
        key: u64,
        what: &str,
    ) -> Result<Option<T>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin read transaction: {}", e))
        })?;
        let table = read_txn.open_table(table_def).map_err(|e| {
            StoreError::DatabaseError(format!("Failed to open {} table: {}", what, e))
        })?;

        match table.get(key) {
            Ok(Some(guard)) => Ok(Some(Self::deserialize(guard.value(), what)?)),
            Ok(None) => Ok(None),
            Err(e) => Err(StoreError::DatabaseError(format!(
                "Failed to get {}: {}",
                what, e
            ))),
        }
    }

    /// Reads every value of a u64-keyed table in key order.
    fn list_u64<T: DeserializeOwned>(
        &self,
        table_def: TableDefinition<u64, &'static [u8]>,
        what: &str,
    ) -> Result<Vec<T>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin read transaction: {}", e))
        })?;
        let table = read_txn.open_table(table_def).map_err(|e| {
            StoreError::DatabaseError(format!("Failed to open {} table: {}", what, e))
        })?;

        let iter = table.iter().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to iterate {}: {}", what, e))
        })?;

        let mut values = Vec::new();
        for result in iter {
            let (_, value) = result.map_err(|e| {
                StoreError::DatabaseError(format!("Failed to read {} entry: {}", what, e))
            })?;
            values.push(Self::deserialize(value.value(), what)?);
        }
        Ok(values)
    }
}

/// Empties one table inside an open write transaction.
fn clear_table<K: redb::Key + 'static>(
    write_txn: &redb::WriteTransaction,
    table_def: TableDefinition<K, &'static [u8]>,
    table_name: &str,
) -> Result<(), StoreError> {
    let mut table = write_txn.open_table(table_def).map_err(|e| {
        StoreError::DatabaseError(format!("Failed to open {} table: {}", table_name, e))
    })?;
    table.retain(|_, _| false).map_err(|e| {
        StoreError::DatabaseError(format!("Failed to clear {}: {}", table_name, e))
    })
}

#[async_trait::async_trait(?Send)]
impl EvalStore for RedbEvalStore {
    // =========================================================================
    // Projects
    // =========================================================================

    async fn put_project(&self, project: &ProjectProfile) -> Result<(), StoreError> {
        let bytes = Self::serialize(project, "project")?;
        self.insert_u64(PROJECTS_TABLE, project.id.as_u64(), &bytes, "project")
    }

    async fn get_project(&self, id: ProjectId) -> Result<Option<ProjectProfile>, StoreError> {
        self.get_u64(PROJECTS_TABLE, id.as_u64(), "project")
    }

    // =========================================================================
    // Queries
    // =========================================================================

    async fn put_query(&self, query: &EvalQuery) -> Result<(), StoreError> {
        let bytes = Self::serialize(query, "query")?;
        self.insert_u64(QUERIES_TABLE, query.query_id.as_u64(), &bytes, "query")
    }

    async fn list_queries(&self) -> Result<Vec<EvalQuery>, StoreError> {
        self.list_u64(QUERIES_TABLE, "queries")
    }

    // =========================================================================
    // Retrieval outcomes
    // =========================================================================

    async fn put_outcome(&self, outcome: &EvaluationOutcome) -> Result<(), StoreError> {
        let bytes = Self::serialize(outcome, "outcome")?;
        self.insert_u64(OUTCOMES_TABLE, outcome.query_id.as_u64(), &bytes, "outcome")
    }

    async fn get_outcome(&self, id: QueryId) -> Result<Option<EvaluationOutcome>, StoreError> {
        self.get_u64(OUTCOMES_TABLE, id.as_u64(), "outcome")
    }

    async fn list_outcomes(&self) -> Result<Vec<EvaluationOutcome>, StoreError> {
        self.list_u64(OUTCOMES_TABLE, "outcomes")
    }

    // =========================================================================
    // Judgments
    // =========================================================================

    async fn put_judgment(&self, judgment: &Judgment) -> Result<(), StoreError> {
        let bytes = Self::serialize(judgment, "judgment")?;
        let pair = judgment.pair();
        let key = (
            judgment.query_id.as_u64(),
            pair.a().as_u64(),
            pair.b().as_u64(),
        );

        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin write transaction: {}", e))
        })?;
        {
            let mut table = write_txn.open_table(JUDGMENTS_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to open judgments table: {}", e))
            })?;
            table.insert(key, bytes.as_slice()).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to insert judgment: {}", e))
            })?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::DatabaseError(format!("Failed to commit judgment: {}", e)))
    }

    async fn judgments_for(&self, id: QueryId) -> Result<Vec<Judgment>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin read transaction: {}", e))
        })?;
        let table = read_txn.open_table(JUDGMENTS_TABLE).map_err(|e| {
            StoreError::DatabaseError(format!("Failed to open judgments table: {}", e))
        })?;

        let q = id.as_u64();
        let range = table
            .range((q, 0u64, 0u64)..=(q, u64::MAX, u64::MAX))
            .map_err(|e| {
                StoreError::DatabaseError(format!("Failed to scan judgments: {}", e))
            })?;

        let mut judgments = Vec::new();
        for result in range {
            let (_, value) = result.map_err(|e| {
                StoreError::DatabaseError(format!("Failed to read judgment entry: {}", e))
            })?;
            judgments.push(Self::deserialize(value.value(), "judgment")?);
        }
        Ok(judgments)
    }

    async fn judged_query_ids(&self) -> Result<BTreeSet<QueryId>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin read transaction: {}", e))
        })?;
        let table = read_txn.open_table(JUDGMENTS_TABLE).map_err(|e| {
            StoreError::DatabaseError(format!("Failed to open judgments table: {}", e))
        })?;

        let iter = table.iter().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to iterate judgments: {}", e))
        })?;

        let mut ids = BTreeSet::new();
        for result in iter {
            let (key, _) = result.map_err(|e| {
                StoreError::DatabaseError(format!("Failed to read judgment entry: {}", e))
            })?;
            ids.insert(QueryId::from_u64(key.value().0));
        }
        Ok(ids)
    }

    // =========================================================================
    // Preferences
    // =========================================================================

    async fn clear_preferences(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin write transaction: {}", e))
        })?;
        clear_table(&write_txn, PREFERENCES_TABLE, "preferences")?;
        write_txn.commit().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to commit preference clear: {}", e))
        })
    }

    async fn put_preference(&self, score: &PreferenceScore) -> Result<(), StoreError> {
        let bytes = Self::serialize(score, "preference")?;
        let key = (score.query_id.as_u64(), score.item_id.as_u64());

        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin write transaction: {}", e))
        })?;
        {
            let mut table = write_txn.open_table(PREFERENCES_TABLE).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to open preferences table: {}", e))
            })?;
            table.insert(key, bytes.as_slice()).map_err(|e| {
                StoreError::DatabaseError(format!("Failed to insert preference: {}", e))
            })?;
        }
        write_txn
            .commit()
            .map_err(|e| StoreError::DatabaseError(format!("Failed to commit preference: {}", e)))
    }

    async fn list_preferences(&self) -> Result<Vec<PreferenceScore>, StoreError> {
        let read_txn = self.db.begin_read().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin read transaction: {}", e))
        })?;
        let table = read_txn.open_table(PREFERENCES_TABLE).map_err(|e| {
            StoreError::DatabaseError(format!("Failed to open preferences table: {}", e))
        })?;

        let iter = table.iter().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to iterate preferences: {}", e))
        })?;

        let mut scores = Vec::new();
        for result in iter {
            let (_, value) = result.map_err(|e| {
                StoreError::DatabaseError(format!("Failed to read preference entry: {}", e))
            })?;
            scores.push(Self::deserialize(value.value(), "preference")?);
        }
        Ok(scores)
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    async fn clear(&self) -> Result<(), StoreError> {
        let write_txn = self.db.begin_write().map_err(|e| {
            StoreError::DatabaseError(format!("Failed to begin write transaction: {}", e))
        })?;

        clear_table(&write_txn, PROJECTS_TABLE, "projects")?;
        clear_table(&write_txn, QUERIES_TABLE, "queries")?;
        clear_table(&write_txn, OUTCOMES_TABLE, "outcomes")?;
        clear_table(&write_txn, JUDGMENTS_TABLE, "judgments")?;
        clear_table(&write_txn, PREFERENCES_TABLE, "preferences")?;

        write_txn
            .commit()
            .map_err(|e| StoreError::DatabaseError(format!("Failed to commit clear: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::judge::types::Winner;
    use tempfile::TempDir;

    fn create_test_store() -> (RedbEvalStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.redb");
        let store = RedbEvalStore::open(&db_path).unwrap();
        (store, temp_dir)
    }

    fn judgment(q: u64, a: u64, b: u64, winner: Winner) -> Judgment {
        Judgment {
            query_id: QueryId::from_u64(q),
            item_a_id: ProjectId::from_u64(a),
            item_b_id: ProjectId::from_u64(b),
            winner,
            reasoning: "because".to_string(),
            evidence_model: "gpt-4o".to_string(),
            position_bias: false,
        }
    }

    #[tokio::test]
    async fn test_query_and_outcome_crud() {
        let (store, _temp) = create_test_store();

        let query = EvalQuery::new(QueryId::from_u64(7), "rust backend fintech")
            .with_ground_truth(ProjectId::from_u64(3))
            .with_category("Fintech");
        store.put_query(&query).await.unwrap();
        assert_eq!(store.list_queries().await.unwrap(), vec![query.clone()]);

        assert!(store
            .get_outcome(QueryId::from_u64(7))
            .await
            .unwrap()
            .is_none());

        let outcome = EvaluationOutcome::score(
            QueryId::from_u64(7),
            vec![ProjectId::from_u64(5), ProjectId::from_u64(3)],
            query.ground_truth_id,
        );
        store.put_outcome(&outcome).await.unwrap();
        assert_eq!(
            store.get_outcome(QueryId::from_u64(7)).await.unwrap(),
            Some(outcome)
        );
        assert!(store.unevaluated_queries().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_judgments_scoped_by_query() {
        let (store, _temp) = create_test_store();

        store.put_judgment(&judgment(1, 1, 2, Winner::A)).await.unwrap();
        store.put_judgment(&judgment(1, 2, 3, Winner::Tie)).await.unwrap();
        store.put_judgment(&judgment(2, 1, 2, Winner::B)).await.unwrap();
        // Same pair again overwrites
        store.put_judgment(&judgment(1, 1, 2, Winner::B)).await.unwrap();

        let first = store.judgments_for(QueryId::from_u64(1)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].winner, Winner::B);
        assert_eq!(first[1].winner, Winner::Tie);

        let judged: Vec<u64> = store
            .judged_query_ids()
            .await
            .unwrap()
            .into_iter()
            .map(|q| q.as_u64())
            .collect();
        assert_eq!(judged, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_preferences_clear() {
        let (store, _temp) = create_test_store();
        let score = PreferenceScore {
            query_id: QueryId::from_u64(1),
            item_id: ProjectId::from_u64(4),
            score: 0.5,
            wins: 1.0,
            comparisons: 2,
            retrieval_rank: None,
        };
        store.put_preference(&score).await.unwrap();
        assert_eq!(store.list_preferences().await.unwrap(), vec![score]);

        store.clear_preferences().await.unwrap();
        assert!(store.list_preferences().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("persist.redb");

        {
            let store = RedbEvalStore::open(&db_path).unwrap();
            let mut project = ProjectProfile::new(ProjectId::from_u64(11));
            project.role = Some("Data Engineer".to_string());
            store.put_project(&project).await.unwrap();
            store.put_judgment(&judgment(3, 10, 11, Winner::A)).await.unwrap();
        }

        let store = RedbEvalStore::open(&db_path).unwrap();
        let project = store
            .get_project(ProjectId::from_u64(11))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(project.role.as_deref(), Some("Data Engineer"));
        assert_eq!(store.judgments_for(QueryId::from_u64(3)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let (store, _temp) = create_test_store();
        store
            .put_query(&EvalQuery::new(QueryId::from_u64(1), "q"))
            .await
            .unwrap();
        store.put_judgment(&judgment(1, 1, 2, Winner::A)).await.unwrap();

        store.clear().await.unwrap();
        assert!(store.list_queries().await.unwrap().is_empty());
        assert!(store.judged_query_ids().await.unwrap().is_empty());
    }
}
