use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use gatelog_core::CoreResult;

/// Sort direction for a search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// A windowed search: `size` documents starting at offset `from`, sorted by one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub from: usize,
    pub size: usize,
    pub sort_field: String,
    pub order: SortOrder,
}

impl SearchRequest {
    /// Newest-first window over `sort_field`.
    pub fn descending(sort_field: impl Into<String>, from: usize, size: usize) -> Self {
        Self {
            from,
            size,
            sort_field: sort_field.into(),
            order: SortOrder::Desc,
        }
    }
}

/// One document returned by a search, in the engine's wire shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index")]
    pub index: String,

    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,

    #[serde(rename = "_id")]
    pub id: String,

    #[serde(rename = "_score", default)]
    pub score: Option<f64>,

    #[serde(rename = "_source")]
    pub source: JsonValue,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<JsonValue>>,
}

/// Result of a search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResponse {
    /// Engine-reported query latency in milliseconds.
    pub took: u64,
    pub hits: Vec<SearchHit>,
}

/// Abstraction over the document engine backing the audit log.
///
/// Implementations must be safe to share across concurrent requests; any
/// concurrency control is the engine's own.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Whether a physical index with this name exists.
    async fn index_exists(&self, index: &str) -> CoreResult<bool>;

    /// Create an index using `schema` as its mappings/settings body.
    ///
    /// Returns `CoreError::AlreadyExists` when the engine reports a duplicate.
    async fn create_index(&self, index: &str, schema: &JsonValue) -> CoreResult<()>;

    /// Store a new document and return the id the engine assigned to it.
    async fn index_document(&self, index: &str, document: &JsonValue) -> CoreResult<String>;

    /// Run a windowed, sorted search over one index.
    async fn search(&self, index: &str, request: &SearchRequest) -> CoreResult<SearchResponse>;
}
