//! JSON import of projects and evaluation queries.
//!
//! The file is a single JSON document:
//!
//! ```json
//! {
//!   "projects": [{"id": 1, "industry": "Fintech", "skills": ["Rust"]}],
//!   "queries": [{"query_id": 10, "query_text": "rust payments", "ground_truth_id": 1}]
//! }
//! ```
//!
//! Both lists are optional. Records replace existing ones with the same id.

use anyhow::{Context, Result};
use ranksight_core::judge::ProjectProfile;
use ranksight_core::storage::{EvalQuery, EvalStore};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

/// Contents of an import file.
#[derive(Debug, Default, Deserialize)]
pub struct ImportFile {
    #[serde(default)]
    pub projects: Vec<ProjectProfile>,
    #[serde(default)]
    pub queries: Vec<EvalQuery>,
}

/// Counts of imported records.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub projects: usize,
    pub queries: usize,
    /// Queries whose ground truth is not among the imported or stored projects
    pub dangling_ground_truth: usize,
}

/// Reads and parses an import file.
pub fn read_import_file(path: &Path) -> Result<ImportFile> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse import file: {}", path.display()))
}

/// Writes every record of `file` to the store.
pub async fn import_into(store: &dyn EvalStore, file: &ImportFile) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    let mut seen = HashSet::new();
    for project in &file.projects {
        if !seen.insert(project.id) {
            warn!("Duplicate project {} in import file, last one wins", project.id);
        }
        store
            .put_project(project)
            .await
            .with_context(|| format!("Failed to store project {}", project.id))?;
        summary.projects += 1;
    }

    for query in &file.queries {
        if let Some(truth) = query.ground_truth_id {
            if !seen.contains(&truth) && store.get_project(truth).await?.is_none() {
                warn!(
                    "Query {}: ground truth project {} is unknown",
                    query.query_id, truth
                );
                summary.dangling_ground_truth += 1;
            }
        }
        store
            .put_query(query)
            .await
            .with_context(|| format!("Failed to store query {}", query.query_id))?;
        summary.queries += 1;
    }

    info!(
        "Imported {} projects and {} queries",
        summary.projects, summary.queries
    );
    Ok(summary)
}
