//! Search backend abstraction.
//!
//! The engine only needs a count for a query against an index. The server
//! crate implements this trait with an HTTP client, keeping this crate free
//! of any transport dependency.

/// Count-only query executor.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Run `query` against `index` and report the total number of matches.
    async fn search(&self, index: &str, query: &str) -> Result<SearchResult, SearchError>;
}

/// Raw search result from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchResult {
    /// Total matching documents.
    pub total_hits: u64,
    /// Server-side query time in milliseconds.
    pub took_ms: u64,
}

/// Errors specific to query execution.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("search request failed: {0}")]
    Request(String),

    #[error("search returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected search response: {0}")]
    Decode(String),
}
