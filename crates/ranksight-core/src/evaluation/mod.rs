//! Retrieval evaluation: how often and how high the index ranks the right project.
//!
//! Every evaluation query carries at most one known-correct project. A query
//! is scored by the position of that project in the retrieved list, and the
//! corpus is summarized with two metrics:
//!
//! | Metric | Description | Use Case |
//! |--------|-------------|----------|
//! | MRR | Mean Reciprocal Rank | How high the right project ranks on average |
//! | Hit@K | Fraction of queries with the right project in the top K | "Would the user see it?" |
//!
//! # Modules
//!
//! - [`metrics`]: per-query `score_one` and [`EvaluationOutcome`]
//! - [`summary`]: corpus aggregation, grouping, and the [`RetrievalTally`] accumulator
//! - [`stats`]: bootstrap confidence intervals and rank correlation
//!
//! # Example
//!
//! ```
//! use ranksight_core::evaluation::{aggregate, EvaluationOutcome};
//! use ranksight_core::search::{ProjectId, QueryId};
//!
//! let retrieved: Vec<ProjectId> = [5, 8, 3, 9].into_iter().map(ProjectId::from_u64).collect();
//! let outcome = EvaluationOutcome::score(QueryId::from_u64(1), retrieved, Some(ProjectId::from_u64(3)));
//! assert_eq!(outcome.rank, Some(3));
//!
//! let summary = aggregate(&[outcome], &[1, 3]);
//! assert_eq!(summary.hit_rate(3), Some(1.0));
//! ```

pub mod metrics;
pub mod stats;
pub mod summary;

pub use metrics::{score_one, EvaluationOutcome};
pub use stats::{bootstrap_ci, spearman_correlation, BootstrapResult};
pub use summary::{aggregate, aggregate_by, RetrievalSummary, RetrievalTally};
