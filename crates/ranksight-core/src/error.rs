//! Error types for ranksight-core.
//!
//! Search and storage errors live next to their traits
//! ([`SearchError`](crate::search::SearchError),
//! [`StoreError`](crate::storage::StoreError)); this module holds the judge
//! error and the pipeline-level error that wraps the fatal cases.

use crate::search::SearchError;
use crate::storage::StoreError;
use thiserror::Error;

/// Errors that can occur while asking a judge to compare two projects.
///
/// Any of these aborts the current pair only. A judge answer that arrives but
/// cannot be understood is *not* an error: it is read as a tie.
#[derive(Debug, Clone, Error)]
pub enum JudgeError {
    /// The model endpoint could not be reached or timed out
    #[error("Judge request failed: {0}")]
    Request(String),
    /// The endpoint answered with a non-success status
    #[error("Judge returned status {status}: {body}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body (possibly truncated)
        body: String,
    },
    /// The completion envelope had no message content
    #[error("Judge returned an empty completion")]
    EmptyCompletion,
}

/// Fatal errors that abort a whole pipeline run.
///
/// Per-query and per-pair failures are counted in the run reports instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading or writing the evaluation store failed
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    /// The search capability is not usable at all
    #[error("Search unavailable: {0}")]
    Search(#[from] SearchError),
    /// Invalid run parameters
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_error_messages() {
        let errors = [
            JudgeError::Request("timed out".to_string()),
            JudgeError::Status {
                status: 429,
                body: "rate limited".to_string(),
            },
            JudgeError::EmptyCompletion,
        ];
        for err in &errors {
            let expected = match err {
                JudgeError::Request(_) => "Judge request failed: timed out",
                JudgeError::Status { .. } => "Judge returned status 429: rate limited",
                JudgeError::EmptyCompletion => "Judge returned an empty completion",
            };
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_pipeline_error_wraps_store_error() {
        let err: PipelineError = StoreError::DatabaseError("locked".to_string()).into();
        assert!(matches!(err, PipelineError::Store(_)));
        assert!(err.to_string().starts_with("Store error:"));
    }
}
