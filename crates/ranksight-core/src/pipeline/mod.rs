//! Resumable evaluation pipeline.
//!
//! Three stages, each driven from the store and safe to re-run:
//!
//! 1. **Retrieval** ([`RetrievalRunner`]): run every unevaluated query through
//!    the retriever, score it, store the outcome
//! 2. **Judging** ([`JudgingRunner`]): run a pairwise tournament over the top
//!    results of every evaluated, unjudged query
//! 3. **Preferences** ([`recompute_preferences`]): derive per-project win
//!    rates from all judgments
//!
//! Per-query and per-pair failures are counted in the run reports; only store
//! failures and unusable configuration abort a stage.

pub mod judging;
pub mod preferences;
pub mod progress;
pub mod retrieval;

pub use judging::{JudgingRunConfig, JudgingRunReport, JudgingRunner};
pub use preferences::{recompute_preferences, PreferenceRunReport};
pub use progress::{ProgressTimer, RunProgress};
pub use retrieval::{RetrievalRunConfig, RetrievalRunReport, RetrievalRunner};
