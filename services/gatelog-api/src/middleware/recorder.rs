//! Request recording middleware
//!
//! Builds one audit record per request once the response is known and hands
//! it to the audit store on a detached task, so storage latency or failures
//! never reach the caller.

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use gatelog_core::AuditRecord;
use gatelog_storage::AuditStore;
use serde_json::{json, Map, Value as JsonValue};
use std::borrow::Cow;
use std::time::Instant;

/// Headers copied into the record. Credentials are never recorded.
const RECORDED_HEADERS: [header::HeaderName; 4] = [
    header::REFERER,
    header::USER_AGENT,
    header::CONTENT_TYPE,
    header::ORIGIN,
];

/// Logical resources named by a request path.
///
/// The first path segment, percent-decoded, is a comma-separated list of
/// resource names unless it starts with `_`, which marks a service-wide endpoint.
/// A segment that does not decode to UTF-8 is used as is.
pub fn indices_from_path(path: &str) -> Vec<String> {
    let raw = path.trim_start_matches('/').split('/').next().unwrap_or("");
    let first = urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw));
    if first.is_empty() || first.starts_with('_') {
        return Vec::new();
    }

    first
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Operation category: the last `_`-prefixed path segment, without the underscore.
pub fn category_from_path(path: &str) -> String {
    path.split('/')
        .rev()
        .find_map(|segment| segment.strip_prefix('_'))
        .filter(|s| !s.is_empty())
        .unwrap_or("other")
        .to_string()
}

fn recorded_headers(headers: &HeaderMap) -> JsonValue {
    let mut recorded = Map::new();
    for name in RECORDED_HEADERS.iter() {
        if let Some(value) = headers.get(name) {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            recorded.insert(name.as_str().to_string(), JsonValue::String(value));
        }
    }
    JsonValue::Object(recorded)
}

pub async fn record_request(store: AuditStore, request: Request, next: Next) -> Response {
    let started = Instant::now();
    let timestamp = Utc::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();
    let path = request.uri().path().to_string();
    let headers = recorded_headers(request.headers());

    let response = next.run(request).await;

    let status = response.status();
    let record = AuditRecord::default()
        .with_timestamp(timestamp)
        .with_indices(indices_from_path(&path))
        .with_field("category", json!(category_from_path(&path)))
        .with_field(
            "request",
            json!({
                "method": method,
                "uri": uri,
                "headers": headers,
            }),
        )
        .with_field(
            "response",
            json!({
                "code": status.as_u16(),
                "status": status.canonical_reason().unwrap_or("Unknown"),
                "took_ms": started.elapsed().as_millis() as u64,
            }),
        );

    store.spawn_append(record);
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_from_path() {
        assert_eq!(indices_from_path("/books/_search"), vec!["books"]);
        assert_eq!(
            indices_from_path("/books,authors/_search"),
            vec!["books", "authors"]
        );
        assert!(indices_from_path("/_cat/indices").is_empty());
        assert!(indices_from_path("/").is_empty());
        assert!(indices_from_path("").is_empty());
    }

    #[test]
    fn test_indices_from_path_decodes_segment() {
        assert_eq!(indices_from_path("/my%20index/_search"), vec!["my index"]);
        assert_eq!(indices_from_path("/a%2Cb/_search"), vec!["a", "b"]);
        assert!(indices_from_path("/%5Fall/_search").is_empty());
        // Not valid UTF-8 once decoded; kept verbatim.
        assert_eq!(indices_from_path("/bad%FF/_search"), vec!["bad%FF"]);
    }

    #[test]
    fn test_category_from_path() {
        assert_eq!(category_from_path("/books/_search"), "search");
        assert_eq!(category_from_path("/books/_doc/1"), "doc");
        assert_eq!(category_from_path("/books"), "other");
    }

    #[test]
    fn test_recorded_headers_skip_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(header::REFERER, "https://app.example.com".parse().unwrap());
        headers.insert(header::AUTHORIZATION, "Bearer secret".parse().unwrap());
        headers.insert("x-api-key", "secret".parse().unwrap());

        let recorded = recorded_headers(&headers);
        assert_eq!(recorded["referer"], "https://app.example.com");
        assert!(recorded.get("authorization").is_none());
        assert!(recorded.get("x-api-key").is_none());
    }
}
