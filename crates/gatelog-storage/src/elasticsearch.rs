//! Elasticsearch-compatible search backend over its REST API.
//!
//! Talks to a single fixed node. Cluster sniffing is never attempted, so the
//! configured URL may sit behind a proxy or load balancer.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value as JsonValue};
use std::time::Duration;
use tracing::debug;

use gatelog_core::{CoreError, CoreResult};

use crate::backend::{SearchBackend, SearchHit, SearchRequest, SearchResponse};

/// REST client bound to one engine endpoint.
#[derive(Clone)]
pub struct ElasticsearchBackend {
    client: Client,
    base_url: String,
}

impl ElasticsearchBackend {
    /// Build a client for `url`; every request is bounded by `timeout`.
    pub fn new(url: impl Into<String>, timeout: Duration) -> CoreResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CoreError::internal(format!("error while initializing search client: {e}")))?;

        Ok(Self::with_client(client, url))
    }

    /// Use a preconfigured `reqwest` client.
    pub fn with_client(client: Client, url: impl Into<String>) -> Self {
        let base_url = url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn index_url(&self, index: &str) -> String {
        format!("{}/{}", self.base_url, index)
    }
}

#[derive(Debug, Deserialize)]
struct IndexDocumentResponse {
    #[serde(rename = "_id")]
    id: String,
}

#[derive(Debug, Deserialize)]
struct RawSearchResponse {
    #[serde(default)]
    took: u64,
    hits: RawHits,
}

#[derive(Debug, Deserialize)]
struct RawHits {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

fn transport_error(operation: &str, err: reqwest::Error) -> CoreError {
    if err.is_timeout() {
        CoreError::Timeout(format!("{operation}: {err}"))
    } else {
        CoreError::StorageError(format!("{operation}: {err}"))
    }
}

async fn status_error(operation: &str, response: reqwest::Response) -> CoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    CoreError::StorageError(format!("{operation}: engine returned {status}: {body}"))
}

#[async_trait]
impl SearchBackend for ElasticsearchBackend {
    async fn index_exists(&self, index: &str) -> CoreResult<bool> {
        let operation = "error while checking if index already exists";
        let response = self
            .client
            .head(self.index_url(index))
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(status_error(operation, response).await),
        }
    }

    async fn create_index(&self, index: &str, schema: &JsonValue) -> CoreResult<()> {
        let operation = format!("error while creating index named \"{index}\"");
        let response = self
            .client
            .put(self.index_url(index))
            .json(schema)
            .send()
            .await
            .map_err(|e| transport_error(&operation, e))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::BAD_REQUEST && body.contains("resource_already_exists_exception") {
            return Err(CoreError::already_exists("index", index));
        }

        Err(CoreError::StorageError(format!(
            "{operation}: engine returned {status}: {body}"
        )))
    }

    async fn index_document(&self, index: &str, document: &JsonValue) -> CoreResult<String> {
        let operation = "error indexing logs record";
        let response = self
            .client
            .post(format!("{}/_doc", self.index_url(index)))
            .json(document)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        if !response.status().is_success() {
            return Err(status_error(operation, response).await);
        }

        let created: IndexDocumentResponse = response
            .json()
            .await
            .map_err(|e| CoreError::DeserializationError(format!("{operation}: {e}")))?;

        debug!(index = %index, id = %created.id, "indexed document");
        Ok(created.id)
    }

    async fn search(&self, index: &str, request: &SearchRequest) -> CoreResult<SearchResponse> {
        let operation = "error while searching logs";
        let mut sort = Map::new();
        sort.insert(request.sort_field.clone(), json!({ "order": request.order }));
        let body = json!({
            "from": request.from,
            "size": request.size,
            "sort": [sort]
        });

        let response = self
            .client
            .post(format!("{}/_search", self.index_url(index)))
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(operation, e))?;

        if !response.status().is_success() {
            return Err(status_error(operation, response).await);
        }

        let raw: RawSearchResponse = response
            .json()
            .await
            .map_err(|e| CoreError::DeserializationError(format!("{operation}: {e}")))?;

        Ok(SearchResponse {
            took: raw.took,
            hits: raw.hits.hits,
        })
    }
}
