//! Elasticsearch search channels.
//!
//! The lexical channel issues a `bool` query: a `multi_match` over the project
//! text, an optional industry `term` filter, and an optional skill `terms`
//! boost. The vector channel issues a top-level `knn` query whose vector is
//! built inside Elasticsearch by a deployed text-embedding model.

use crate::config::ElasticSettings;
use async_trait::async_trait;
use ranksight_core::search::{ProjectId, RankedResult, SearchChannel, SearchError, SearchFilters};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

/// Fields searched by the lexical channel, with boosts.
const TEXT_FIELDS: &[&str] = &["text^3", "metadata.referenceName", "metadata.standardPositions"];

/// Boost applied to projects that share a skill with the query.
const SKILL_BOOST: f64 = 2.0;

/// kNN candidates considered per returned hit.
const KNN_CANDIDATE_FACTOR: usize = 2;

/// Longest error body kept in an error message.
const MAX_ERROR_BODY: usize = 500;

/// What kind of query a channel sends.
#[derive(Debug, Clone)]
enum QueryKind {
    Text,
    Knn { field: String, model_id: String },
}

/// One Elasticsearch-backed [`SearchChannel`].
pub struct ElasticChannel {
    name: &'static str,
    client: reqwest::Client,
    search_url: String,
    api_key: Option<String>,
    kind: QueryKind,
}

impl ElasticChannel {
    /// Lexical (`multi_match`) channel.
    pub fn text(client: reqwest::Client, settings: &ElasticSettings) -> Self {
        Self::with_kind("elastic-text", client, settings, QueryKind::Text)
    }

    /// kNN channel, if the index has a vector field and an embedding model.
    pub fn knn(client: reqwest::Client, settings: &ElasticSettings) -> Option<Self> {
        let field = settings.vector_field.clone()?;
        let model_id = settings.embedding_model_id.clone()?;
        Some(Self::with_kind(
            "elastic-knn",
            client,
            settings,
            QueryKind::Knn { field, model_id },
        ))
    }

    fn with_kind(
        name: &'static str,
        client: reqwest::Client,
        settings: &ElasticSettings,
        kind: QueryKind,
    ) -> Self {
        Self {
            name,
            client,
            search_url: format!(
                "{}/{}/_search",
                settings.url.trim_end_matches('/'),
                settings.index
            ),
            api_key: settings.api_key.clone(),
            kind,
        }
    }

    fn build_query(&self, query_text: &str, filters: &SearchFilters, top_k: usize) -> Value {
        match &self.kind {
            QueryKind::Text => text_query(query_text, filters, top_k),
            QueryKind::Knn { field, model_id } => {
                knn_query(field, model_id, query_text, filters, top_k)
            }
        }
    }

    fn failed(&self, message: impl Into<String>) -> SearchError {
        SearchError::ChannelFailed {
            channel: self.name.to_string(),
            message: message.into(),
        }
    }
}

#[async_trait(?Send)]
impl SearchChannel for ElasticChannel {
    fn name(&self) -> &str {
        self.name
    }

    async fn search(
        &self,
        query_text: &str,
        filters: &SearchFilters,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, SearchError> {
        let body = self.build_query(query_text, filters, top_k);

        let mut request = self.client.post(&self.search_url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("ApiKey {}", key));
        }

        let resp = request
            .send()
            .await
            .map_err(|e| self.failed(format!("request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(self.failed(format!(
                "returned {}: {}",
                status,
                truncate(&body, MAX_ERROR_BODY)
            )));
        }

        let parsed: SearchResponse = resp
            .json()
            .await
            .map_err(|e| self.failed(format!("invalid response: {}", e)))?;

        let results = parse_hits(parsed, top_k);
        debug!("{}: {} hits for \"{}\"", self.name, results.len(), query_text);
        Ok(results)
    }
}

/// Builds the lexical `bool` query.
fn text_query(query_text: &str, filters: &SearchFilters, top_k: usize) -> Value {
    let mut bool_query = json!({
        "must": [{
            "multi_match": {
                "query": query_text,
                "fields": TEXT_FIELDS,
                "type": "best_fields"
            }
        }],
        "filter": industry_filter(filters),
    });

    if !filters.skill_ids.is_empty() {
        bool_query["should"] = json!([{
            "terms": {
                "metadata.skillIDs": filters.skill_ids,
                "boost": SKILL_BOOST
            }
        }]);
        bool_query["minimum_should_match"] = json!(0);
    }

    json!({
        "size": top_k,
        "query": { "bool": bool_query }
    })
}

/// Builds a top-level `knn` query. Skills are not applied: kNN has no boost.
fn knn_query(
    field: &str,
    model_id: &str,
    query_text: &str,
    filters: &SearchFilters,
    top_k: usize,
) -> Value {
    let mut knn = json!({
        "field": field,
        "k": top_k,
        "num_candidates": top_k * KNN_CANDIDATE_FACTOR,
        "query_vector_builder": {
            "text_embedding": {
                "model_id": model_id,
                "model_text": query_text
            }
        }
    });
    let filter = industry_filter(filters);
    if !filter.is_empty() {
        knn["filter"] = Value::Array(filter);
    }

    json!({
        "size": top_k,
        "knn": knn
    })
}

fn industry_filter(filters: &SearchFilters) -> Vec<Value> {
    filters
        .industry_id
        .map(|id| json!({ "term": { "metadata.industryID": id } }))
        .into_iter()
        .collect()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: HitsEnvelope,
}

#[derive(Debug, Deserialize)]
struct HitsEnvelope {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_score", default)]
    score: Option<f32>,
    #[serde(rename = "_source", default)]
    source: Value,
}

/// Extracts `(project id, score)` pairs in hit order.
///
/// The id lives at `_source.metadata.userProjectHistoryID` and may be a
/// number or a numeric string. Hits without a usable id are dropped.
fn parse_hits(response: SearchResponse, top_k: usize) -> Vec<RankedResult> {
    let mut results = Vec::with_capacity(response.hits.hits.len().min(top_k));
    for hit in response.hits.hits {
        let raw_id = &hit.source["metadata"]["userProjectHistoryID"];
        let id = match raw_id {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        match id {
            Some(id) => results.push(RankedResult::new(
                ProjectId::from_u64(id),
                hit.score.unwrap_or(0.0),
            )),
            None => warn!("Dropping search hit without a project id: {}", raw_id),
        }
    }
    results.truncate(top_k);
    results
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
