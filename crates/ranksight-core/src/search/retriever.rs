//! Search capability trait and mode-aware retriever.
//!
//! A [`SearchChannel`] is one ranked source of results (an Elasticsearch
//! `multi_match` query, a kNN query, a test fake). [`HybridRetriever`] owns up
//! to two channels and decides, based on [`SearchMode`], whether to return one
//! channel's ranking or the RRF fusion of both.

use super::fusion::reciprocal_rank_fusion;
use super::types::{RankedResult, SearchError, SearchFilters, SearchMode};
use crate::config::{HYBRID_CANDIDATE_MULTIPLIER, RRF_K};
use tracing::debug;

/// A single ranked search source.
///
/// Implementations return at most `top_k` results ordered by descending
/// relevance. They must not pad or fabricate ids.
#[async_trait::async_trait(?Send)]
pub trait SearchChannel {
    /// Short channel name used in logs and errors.
    fn name(&self) -> &str;

    /// Runs the query against this channel.
    async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, SearchError>;
}

/// Retriever that applies the configured [`SearchMode`].
pub struct HybridRetriever {
    mode: SearchMode,
    text: Option<Box<dyn SearchChannel>>,
    vector: Option<Box<dyn SearchChannel>>,
    rrf_k: usize,
}

impl std::fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("mode", &self.mode)
            .field("text", &self.text.as_ref().map(|c| c.name().to_string()))
            .field("vector", &self.vector.as_ref().map(|c| c.name().to_string()))
            .field("rrf_k", &self.rrf_k)
            .finish()
    }
}

impl HybridRetriever {
    /// Creates a retriever for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::ChannelUnconfigured`] if the mode needs a channel
    /// that was not supplied. This is the one search failure that aborts a
    /// whole run.
    pub fn new(
        mode: SearchMode,
        text: Option<Box<dyn SearchChannel>>,
        vector: Option<Box<dyn SearchChannel>>,
    ) -> Result<Self, SearchError> {
        let ok = match mode {
            SearchMode::Text => text.is_some(),
            SearchMode::Vector => vector.is_some(),
            SearchMode::Hybrid => text.is_some() && vector.is_some(),
        };
        if !ok {
            return Err(SearchError::ChannelUnconfigured(mode));
        }
        Ok(Self {
            mode,
            text,
            vector,
            rrf_k: RRF_K,
        })
    }

    /// Convenience constructor for a text-only retriever.
    pub fn text_only(channel: Box<dyn SearchChannel>) -> Self {
        Self {
            mode: SearchMode::Text,
            text: Some(channel),
            vector: None,
            rrf_k: RRF_K,
        }
    }

    /// Overrides the RRF smoothing constant used in hybrid mode.
    pub fn with_rrf_k(mut self, rrf_k: usize) -> Self {
        self.rrf_k = rrf_k;
        self
    }

    /// Returns the active mode.
    pub fn mode(&self) -> SearchMode {
        self.mode
    }

    /// Retrieves up to `top_k` results for a query.
    ///
    /// In hybrid mode each channel is asked for
    /// `top_k * HYBRID_CANDIDATE_MULTIPLIER` candidates before fusion so that
    /// items ranked just below the cutoff in one channel can still be lifted
    /// by the other. If either channel fails, the whole retrieval fails.
    pub async fn retrieve(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, SearchError> {
        if top_k == 0 {
            return Err(SearchError::InvalidQuery(
                "Number of results (top_k) must be greater than 0".to_string(),
            ));
        }

        match self.mode {
            SearchMode::Text => {
                let channel = self.channel(&self.text)?;
                let mut results = channel.search(query_text, filters, top_k).await?;
                results.truncate(top_k);
                Ok(results)
            }
            SearchMode::Vector => {
                let channel = self.channel(&self.vector)?;
                let mut results = channel.search(query_text, filters, top_k).await?;
                results.truncate(top_k);
                Ok(results)
            }
            SearchMode::Hybrid => {
                let depth = top_k.saturating_mul(HYBRID_CANDIDATE_MULTIPLIER);
                let text_results = self
                    .channel(&self.text)?
                    .search(query_text, filters, depth)
                    .await?;
                let vector_results = self
                    .channel(&self.vector)?
                    .search(query_text, filters, depth)
                    .await?;
                debug!(
                    "Hybrid retrieval: {} text, {} vector candidates",
                    text_results.len(),
                    vector_results.len()
                );
                Ok(reciprocal_rank_fusion(
                    &text_results,
                    &vector_results,
                    self.rrf_k,
                    top_k,
                ))
            }
        }
    }

    fn channel<'a>(
        &self,
        slot: &'a Option<Box<dyn SearchChannel>>,
    ) -> Result<&'a dyn SearchChannel, SearchError> {
        slot.as_deref()
            .ok_or(SearchError::ChannelUnconfigured(self.mode))
    }
}
