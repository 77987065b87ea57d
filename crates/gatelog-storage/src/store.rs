//! Audit log store: idempotent provisioning, best-effort writes and
//! paginated, resource-filtered reads over one physical index.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use gatelog_core::{indices_of, is_subset, AuditRecord, CoreError, CoreResult, TIMESTAMP_FIELD};

use crate::backend::{SearchBackend, SearchHit, SearchRequest};
use crate::elasticsearch::ElasticsearchBackend;

/// One page of audit records as served by the read API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogPage {
    /// Hits that passed the resource filter, newest first.
    pub logs: Vec<SearchHit>,
    /// Number of entries in `logs`.
    pub total: usize,
    /// Engine-reported query latency in milliseconds.
    pub took: u64,
}

/// Handle binding a search backend to the audit index.
///
/// Cheap to clone; all clones share the same connection. Only obtainable
/// through [`AuditStore::open`], so a handle always refers to a provisioned index.
#[derive(Clone)]
pub struct AuditStore {
    backend: Arc<dyn SearchBackend>,
    index: Arc<str>,
}

impl AuditStore {
    /// Bind `backend` to `index`, creating the index from `schema` if it does not exist.
    ///
    /// An existing index is left untouched. The existence check and the
    /// creation are separate requests; if another process creates the index in
    /// between, the engine's duplicate error is returned as is.
    pub async fn open(
        backend: Arc<dyn SearchBackend>,
        index: impl Into<String>,
        schema: &JsonValue,
    ) -> CoreResult<Self> {
        let index = index.into();

        let exists = backend.index_exists(&index).await.map_err(|e| {
            error!(index = %index, error = %e, "failed to check audit index");
            e
        })?;

        if exists {
            info!(index = %index, "audit index already exists, skipping creation");
        } else {
            backend.create_index(&index, schema).await.map_err(|e| {
                error!(index = %index, error = %e, "failed to create audit index");
                e
            })?;
            info!(index = %index, "created audit index");
        }

        Ok(Self {
            backend,
            index: index.into(),
        })
    }

    /// Connect to an engine at `url` and open `index` on it.
    pub async fn connect(
        url: &str,
        index: impl Into<String>,
        schema: &JsonValue,
        timeout: Duration,
    ) -> CoreResult<Self> {
        let backend = ElasticsearchBackend::new(url, timeout)?;
        info!(url = %backend.base_url(), "connecting audit store");
        Self::open(Arc::new(backend), index, schema).await
    }

    /// Name of the bound index.
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Persist one record. Failures are logged and dropped, never retried.
    pub async fn append(&self, record: &AuditRecord) {
        let document = match serde_json::to_value(record) {
            Ok(document) => document,
            Err(e) => {
                error!(index = %self.index, error = %e, "error serializing logs record");
                return;
            }
        };

        match self.backend.index_document(&self.index, &document).await {
            Ok(id) => debug!(index = %self.index, id = %id, "stored logs record"),
            Err(e) => error!(index = %self.index, error = %e, "error indexing logs record"),
        }
    }

    /// Persist one record on a detached task so the caller never waits on storage.
    pub fn spawn_append(&self, record: AuditRecord) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move { store.append(&record).await })
    }

    /// Read one page with string-encoded pagination and return it serialized as JSON.
    pub async fn query(&self, from: &str, size: &str, resource_filter: &[String]) -> CoreResult<Vec<u8>> {
        let (from, size) = parse_pagination(from, size)?;
        let page = self.query_page(from, size, resource_filter).await?;
        Ok(serde_json::to_vec(&page)?)
    }

    /// Fetch `size` records from offset `from`, newest first, then keep those
    /// whose `indices` contain every name in `resource_filter`.
    ///
    /// Filtering happens after the window is fetched, so `total` can be smaller
    /// than `size` even when more matching records exist past the window.
    pub async fn query_page(
        &self,
        from: usize,
        size: usize,
        resource_filter: &[String],
    ) -> CoreResult<LogPage> {
        let request = SearchRequest::descending(TIMESTAMP_FIELD, from, size);
        let response = self.backend.search(&self.index, &request).await?;

        let mut logs = Vec::with_capacity(response.hits.len());
        for hit in response.hits {
            let fields = hit.source.as_object().ok_or_else(|| {
                CoreError::DeserializationError(format!(
                    "logs record {} is not a JSON object",
                    hit.id
                ))
            })?;

            let indices = match indices_of(fields) {
                Ok(indices) => indices,
                Err(e) => {
                    warn!(index = %self.index, id = %hit.id, error = %e, "skipping logs record");
                    continue;
                }
            };

            if resource_filter.is_empty() || is_subset(resource_filter, &indices) {
                logs.push(hit);
            }
        }

        debug!(
            index = %self.index,
            from,
            size,
            kept = logs.len(),
            took = response.took,
            "served logs page"
        );

        Ok(LogPage {
            total: logs.len(),
            logs,
            took: response.took,
        })
    }
}

/// Parse `from`/`size` query parameters as non-negative integers.
pub fn parse_pagination(from: &str, size: &str) -> CoreResult<(usize, usize)> {
    let offset = from
        .trim()
        .parse::<usize>()
        .map_err(|_| CoreError::invalid_parameter("from", from))?;
    let size = size
        .trim()
        .parse::<usize>()
        .map_err(|_| CoreError::invalid_parameter("size", size))?;
    Ok((offset, size))
}
