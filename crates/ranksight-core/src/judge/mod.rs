//! Pairwise relevance judging.
//!
//! An independent judge (usually an LLM) compares two projects at a time
//! against a query. Running every pair twice with the presentation order
//! swapped exposes judges that favor whichever project is shown first.
//!
//! # Modules
//!
//! - `types`: [`Verdict`], [`Winner`], [`PairKey`], [`Judgment`], [`ProjectProfile`]
//! - `tournament`: [`PairwiseTournament`], the round-robin runner
//! - `prompt`: prompt rendering and tolerant verdict parsing
//! - `llm`: [`LlmJudge`] on top of any [`ChatModel`]

pub mod llm;
pub mod prompt;
pub mod tournament;
pub mod types;

pub use llm::{ChatModel, LlmJudge};
pub use tournament::{PairwiseTournament, TournamentConfig, TournamentReport};
pub use types::{Comparison, Judgment, PairKey, ProjectProfile, Verdict, Winner};

use crate::error::JudgeError;

/// Capability: decide which of two projects better fits a query.
///
/// `left` is the project shown first. Implementations report the verdict
/// relative to that presentation order; the tournament handles swapping.
#[async_trait::async_trait(?Send)]
pub trait Judge {
    /// Identifier recorded as `evidence_model` on every judgment.
    fn model_id(&self) -> &str;

    /// Compares two projects for relevance to `query_text`.
    async fn compare(
        &self,
        query_text: &str,
        left: &ProjectProfile,
        right: &ProjectProfile,
    ) -> Result<Comparison, JudgeError>;
}
