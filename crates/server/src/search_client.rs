//! Elasticsearch-compatible HTTP implementation of [`SearchBackend`].
//!
//! Runs a `query_string` query with `size: 0` and reads only the total hit
//! count and server-side latency. No request timeout is set beyond the
//! transport defaults.
//!
//! Requires Elasticsearch 6.0 or newer: every request sets
//! `track_total_hits`, which 7.x needs for exact counts above 10,000 and
//! which 5.x clusters reject.

use serde_json::{json, Value};

use searchwatch_policy::{SearchBackend, SearchError, SearchResult};

pub struct ElasticsearchClient {
    base_url: String,
    /// Shared HTTP client (connection pooling).
    client: reqwest::Client,
}

impl ElasticsearchClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn search_url(&self, index: &str) -> String {
        format!("{}/{}/_search", self.base_url, index)
    }
}

/// Request body for a count-only query.
pub(crate) fn count_request(query: &str) -> Value {
    json!({
        "size": 0,
        "track_total_hits": true,
        "query": { "query_string": { "query": query } },
    })
}

/// Extract total hits and `took` from a search response.
///
/// `hits.total` is a plain number on 6.x and an object with a `value` field
/// from 7.0 on.
pub(crate) fn parse_search_response(body: &Value) -> Result<SearchResult, SearchError> {
    let total = &body["hits"]["total"];
    let total_hits = total
        .as_u64()
        .or_else(|| total["value"].as_u64())
        .ok_or_else(|| SearchError::Decode("missing hits.total".to_string()))?;
    let took_ms = body["took"].as_u64().unwrap_or(0);
    Ok(SearchResult {
        total_hits,
        took_ms,
    })
}

#[async_trait::async_trait]
impl SearchBackend for ElasticsearchClient {
    async fn search(&self, index: &str, query: &str) -> Result<SearchResult, SearchError> {
        let url = self.search_url(index);
        tracing::debug!(%url, "search request");

        let response = self
            .client
            .post(&url)
            .json(&count_request(query))
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;
        parse_search_response(&body)
    }
}
