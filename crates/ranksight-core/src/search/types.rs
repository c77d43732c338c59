use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of a project in the search index.
///
/// Projects are identified by the integer id the index stores in its document
/// metadata. The newtype keeps project ids from being confused with query ids.
///
/// # Examples
///
/// ```
/// use ranksight_core::search::ProjectId;
///
/// let id = ProjectId::from_u64(42);
/// assert_eq!(id.as_u64(), 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(u64);

impl ProjectId {
    /// Creates a ProjectId from a raw u64 value.
    pub const fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this ID.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an evaluation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct QueryId(u64);

impl QueryId {
    /// Creates a QueryId from a raw u64 value.
    pub const fn from_u64(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw u64 value of this ID.
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for QueryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One entry of a ranked result list.
///
/// The rank is not stored: it is the 1-indexed position of the entry in the
/// sequence it belongs to. Producers must therefore keep lists ordered by
/// descending relevance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    /// Project identifier
    pub id: ProjectId,
    /// Channel-specific relevance score (BM25, cosine, or fused RRF score)
    pub score: f32,
}

impl RankedResult {
    /// Creates a new ranked result.
    pub fn new(id: ProjectId, score: f32) -> Self {
        Self { id, score }
    }
}

/// Extracts the id sequence of a ranked list, preserving order.
pub fn ranked_ids(results: &[RankedResult]) -> Vec<ProjectId> {
    results.iter().map(|r| r.id).collect()
}

/// Optional constraints passed through to search channels.
///
/// `industry_id` is a hard filter; `skill_ids` only boost matching projects.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    /// Restrict results to a single industry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub industry_id: Option<u64>,
    /// Boost projects tagged with any of these skills
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skill_ids: Vec<u64>,
}

impl SearchFilters {
    /// Returns true when no filter or boost is set.
    pub fn is_empty(&self) -> bool {
        self.industry_id.is_none() && self.skill_ids.is_empty()
    }
}

/// Which channels the retriever consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Lexical channel only
    #[default]
    Text,
    /// Vector channel only
    Vector,
    /// Both channels merged with Reciprocal Rank Fusion
    Hybrid,
}

impl SearchMode {
    /// Returns the lowercase name used in configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchMode::Text => "text",
            SearchMode::Vector => "vector",
            SearchMode::Hybrid => "hybrid",
        }
    }
}

impl std::str::FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "lexical" | "bm25" => Ok(SearchMode::Text),
            "vector" | "knn" | "semantic" => Ok(SearchMode::Vector),
            "hybrid" | "rrf" => Ok(SearchMode::Hybrid),
            other => Err(SearchError::InvalidQuery(format!(
                "Unknown search mode '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for SearchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error types for search operations.
#[derive(Debug, Clone, Error)]
pub enum SearchError {
    /// A channel was reached but the search failed (network, bad response)
    #[error("Search channel '{channel}' failed: {message}")]
    ChannelFailed {
        /// Channel name
        channel: String,
        /// Failure description
        message: String,
    },
    /// The selected mode needs a channel that was never configured
    #[error("Search channel not configured for mode '{0}'")]
    ChannelUnconfigured(SearchMode),
    /// Invalid search query or parameters
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
}

impl SearchError {
    /// Returns true if the error means the retriever can never succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SearchError::ChannelUnconfigured(_))
    }
}
