//! Retrieval: ranked results, rank fusion, and the search capability.
//!
//! This module turns one or two independently ranked result lists into the
//! ranking that the evaluation and judging stages consume:
//! - **Lexical channel** (e.g. BM25 `multi_match`)
//! - **Vector channel** (e.g. kNN over project embeddings)
//! - **Reciprocal Rank Fusion** (RRF) to merge the two
//!
//! # Architecture
//!
//! - `types`: Core types (ProjectId, QueryId, RankedResult, SearchFilters, SearchMode, SearchError)
//! - `fusion`: Reciprocal Rank Fusion of two ranked lists
//! - `retriever`: [`SearchChannel`] trait and the mode-aware [`HybridRetriever`]
//!
//! # Usage
//!
//! ```ignore
//! use ranksight_core::search::{HybridRetriever, SearchFilters, SearchMode};
//!
//! let retriever = HybridRetriever::new(SearchMode::Hybrid, Some(text), Some(vector))?;
//! let ranked = retriever.retrieve("react developer fintech", &SearchFilters::default(), 20).await?;
//! ```
//!
//! # Reciprocal Rank Fusion
//!
//! - Formula: `score = Σ 1 / (k + rank)` where k=60
//! - Uses ranks only, so channel score scales never need normalizing
//! - Deterministic: ties keep first-seen order (text channel first)

pub mod fusion;
pub mod retriever;
pub mod types;

pub use fusion::{max_rrf_score, reciprocal_rank_fusion};
pub use retriever::{HybridRetriever, SearchChannel};
pub use types::{
    ranked_ids, ProjectId, QueryId, RankedResult, SearchError, SearchFilters, SearchMode,
};
