//! In-memory search backend for testing
//!
//! Mirrors the engine behaviour the audit store relies on: duplicate index
//! creation is rejected, documents get generated ids, searches sort by one
//! field with missing values last. Individual operations can be made to fail
//! to exercise error paths.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

use gatelog_core::{CoreError, CoreResult};

use crate::backend::{SearchBackend, SearchHit, SearchRequest, SearchResponse, SortOrder};

/// Backend operations that can be failed on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    IndexExists,
    CreateIndex,
    IndexDocument,
    Search,
}

#[derive(Debug, Default)]
struct MemoryIndex {
    schema: JsonValue,
    documents: Vec<(String, JsonValue)>,
}

/// In-memory search backend (for testing)
#[derive(Clone, Default)]
pub struct MemorySearchBackend {
    indices: Arc<RwLock<HashMap<String, MemoryIndex>>>,
    failing: Arc<RwLock<HashSet<Operation>>>,
    calls: Arc<RwLock<HashMap<Operation, usize>>>,
}

impl MemorySearchBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call of `operation` fail with a storage error.
    pub fn fail(&self, operation: Operation) {
        self.failing.write().insert(operation);
    }

    /// Undo a previous [`fail`](Self::fail).
    pub fn recover(&self, operation: Operation) {
        self.failing.write().remove(&operation);
    }

    /// Number of times `operation` was invoked, failed calls included.
    pub fn call_count(&self, operation: Operation) -> usize {
        self.calls.read().get(&operation).copied().unwrap_or(0)
    }

    /// Schema an index was created with.
    pub fn schema(&self, index: &str) -> Option<JsonValue> {
        self.indices.read().get(index).map(|i| i.schema.clone())
    }

    /// Sources of every stored document, in insertion order.
    pub fn documents(&self, index: &str) -> Vec<JsonValue> {
        self.indices
            .read()
            .get(index)
            .map(|i| i.documents.iter().map(|(_, doc)| doc.clone()).collect())
            .unwrap_or_default()
    }

    /// Store a document verbatim, bypassing any validation. Useful for seeding malformed data.
    pub fn insert_raw(&self, index: &str, document: JsonValue) -> String {
        let id = Uuid::new_v4().to_string();
        self.indices
            .write()
            .entry(index.to_string())
            .or_default()
            .documents
            .push((id.clone(), document));
        id
    }

    fn enter(&self, operation: Operation) -> CoreResult<()> {
        *self.calls.write().entry(operation).or_insert(0) += 1;
        if self.failing.read().contains(&operation) {
            return Err(CoreError::StorageError(format!(
                "injected failure for {operation:?}"
            )));
        }
        Ok(())
    }
}

fn compare_values(a: &JsonValue, b: &JsonValue) -> Ordering {
    match (a, b) {
        (JsonValue::Number(x), JsonValue::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (JsonValue::String(x), JsonValue::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

fn sort_key<'a>(document: &'a JsonValue, field: &str) -> Option<&'a JsonValue> {
    document
        .get(field)
        .filter(|v| v.is_number() || v.is_string())
}

#[async_trait]
impl SearchBackend for MemorySearchBackend {
    async fn index_exists(&self, index: &str) -> CoreResult<bool> {
        self.enter(Operation::IndexExists)?;
        Ok(self.indices.read().contains_key(index))
    }

    async fn create_index(&self, index: &str, schema: &JsonValue) -> CoreResult<()> {
        self.enter(Operation::CreateIndex)?;
        let mut indices = self.indices.write();
        if indices.contains_key(index) {
            return Err(CoreError::already_exists("index", index));
        }
        indices.insert(
            index.to_string(),
            MemoryIndex {
                schema: schema.clone(),
                documents: Vec::new(),
            },
        );
        Ok(())
    }

    async fn index_document(&self, index: &str, document: &JsonValue) -> CoreResult<String> {
        self.enter(Operation::IndexDocument)?;
        // The engine auto-creates unknown indices on write.
        Ok(self.insert_raw(index, document.clone()))
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> CoreResult<SearchResponse> {
        self.enter(Operation::Search)?;
        let started = Instant::now();

        let indices = self.indices.read();
        let stored = indices
            .get(index)
            .ok_or_else(|| CoreError::StorageError(format!("no such index [{index}]")))?;

        let mut ordered: Vec<&(String, JsonValue)> = stored.documents.iter().collect();
        // Documents without a sortable value go last in either direction.
        ordered.sort_by(|(_, a), (_, b)| {
            match (sort_key(a, &request.sort_field), sort_key(b, &request.sort_field)) {
                (Some(x), Some(y)) => match request.order {
                    SortOrder::Asc => compare_values(x, y),
                    SortOrder::Desc => compare_values(y, x),
                },
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            }
        });

        let hits = ordered
            .into_iter()
            .skip(request.from)
            .take(request.size)
            .map(|(id, source)| SearchHit {
                index: index.to_string(),
                doc_type: Some("_doc".to_string()),
                id: id.clone(),
                score: None,
                sort: sort_key(source, &request.sort_field).map(|v| vec![v.clone()]),
                source: source.clone(),
            })
            .collect();

        Ok(SearchResponse {
            took: started.elapsed().as_millis() as u64,
            hits,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_index_twice_is_rejected() {
        let backend = MemorySearchBackend::new();
        backend.create_index("logs", &json!({})).await.unwrap();
        let err = backend.create_index("logs", &json!({})).await.unwrap_err();
        assert!(matches!(err, CoreError::AlreadyExists { .. }));
        assert!(backend.index_exists("logs").await.unwrap());
    }

    #[tokio::test]
    async fn test_search_sorts_descending_with_missing_last() {
        let backend = MemorySearchBackend::new();
        backend.create_index("logs", &json!({})).await.unwrap();
        backend.insert_raw("logs", json!({"timestamp": "2024-01-01T00:00:00Z", "n": 1}));
        backend.insert_raw("logs", json!({"n": 0}));
        backend.insert_raw("logs", json!({"timestamp": "2024-03-01T00:00:00Z", "n": 3}));
        backend.insert_raw("logs", json!({"timestamp": "2024-02-01T00:00:00Z", "n": 2}));

        let response = backend
            .search("logs", &SearchRequest::descending("timestamp", 0, 10))
            .await
            .unwrap();
        let order: Vec<i64> = response
            .hits
            .iter()
            .map(|h| h.source["n"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![3, 2, 1, 0]);
    }

    #[tokio::test]
    async fn test_search_window() {
        let backend = MemorySearchBackend::new();
        backend.create_index("logs", &json!({})).await.unwrap();
        for n in 0..5 {
            backend.insert_raw("logs", json!({"timestamp": n}));
        }

        let response = backend
            .search("logs", &SearchRequest::descending("timestamp", 1, 2))
            .await
            .unwrap();
        let order: Vec<i64> = response
            .hits
            .iter()
            .map(|h| h.source["timestamp"].as_i64().unwrap())
            .collect();
        assert_eq!(order, vec![3, 2]);
    }

    #[tokio::test]
    async fn test_search_unknown_index_fails() {
        let backend = MemorySearchBackend::new();
        let result = backend
            .search("missing", &SearchRequest::descending("timestamp", 0, 1))
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_injected_failure_and_recovery() {
        let backend = MemorySearchBackend::new();
        backend.fail(Operation::IndexDocument);
        assert!(backend.index_document("logs", &json!({})).await.is_err());

        backend.recover(Operation::IndexDocument);
        assert!(backend.index_document("logs", &json!({})).await.is_ok());
        assert_eq!(backend.call_count(Operation::IndexDocument), 2);
        assert_eq!(backend.documents("logs").len(), 1);
    }
}
