//! LLM-backed [`Judge`].
//!
//! [`LlmJudge`] renders the comparison prompt, hands it to a [`ChatModel`], and
//! parses the JSON answer. The chat model is the only part that touches the
//! network; the binary crate supplies an OpenAI / Azure OpenAI implementation.

use super::prompt::{build_prompt, parse_verdict};
use super::types::{Comparison, ProjectProfile};
use super::Judge;
use crate::error::JudgeError;
use tracing::debug;

/// A chat-completion endpoint that answers in JSON.
#[async_trait::async_trait(?Send)]
pub trait ChatModel {
    /// Model or deployment name recorded as judgment evidence.
    fn model_name(&self) -> &str;

    /// Sends a single user prompt and returns the raw completion text.
    ///
    /// Implementations should request JSON output and deterministic
    /// sampling (temperature 0).
    async fn complete_json(&self, prompt: &str) -> Result<String, JudgeError>;
}

/// Pairwise judge that asks a language model which project fits a query better.
pub struct LlmJudge<C> {
    model: C,
}

impl<C: ChatModel> LlmJudge<C> {
    /// Wraps a chat model.
    pub fn new(model: C) -> Self {
        Self { model }
    }

    /// Returns the wrapped chat model.
    pub fn model(&self) -> &C {
        &self.model
    }
}

#[async_trait::async_trait(?Send)]
impl<C: ChatModel> Judge for LlmJudge<C> {
    fn model_id(&self) -> &str {
        self.model.model_name()
    }

    async fn compare(
        &self,
        query_text: &str,
        left: &ProjectProfile,
        right: &ProjectProfile,
    ) -> Result<Comparison, JudgeError> {
        let prompt = build_prompt(query_text, left, right);
        let raw = self.model.complete_json(&prompt).await?;
        let comparison = parse_verdict(&raw);
        debug!(
            "Judge {} compared {} (left) vs {} (right): {:?}",
            self.model.model_name(),
            left.id,
            right.id,
            comparison.verdict
        );
        Ok(comparison)
    }
}
