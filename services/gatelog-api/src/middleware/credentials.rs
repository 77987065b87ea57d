//! API key credential resolution
//!
//! Stands in for an external authenticator: maps a presented API key to the
//! configured [`Credential`] and, for permission keys, its [`PermissionRecord`],
//! and stores both in the request extensions for the referer gate.

use axum::{
    extract::Request,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use gatelog_core::{ApiKeyConfig, Credential, PermissionRecord};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::error::ApiError;

/// Resolved identity for one configured key.
#[derive(Debug, Clone)]
struct KeyEntry {
    key: String,
    credential: Credential,
    permission: Option<PermissionRecord>,
}

/// Set of API keys accepted by the service.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    entries: Arc<Vec<KeyEntry>>,
}

impl ApiKeys {
    pub fn from_config(keys: &[ApiKeyConfig]) -> Self {
        let entries = keys
            .iter()
            .map(|k| KeyEntry {
                key: k.key.clone(),
                credential: k.credential,
                permission: k.permission(),
            })
            .collect();

        Self {
            entries: Arc::new(entries),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Look up a presented key, comparing every candidate in constant time.
    fn resolve(&self, presented: &str) -> Option<&KeyEntry> {
        self.entries.iter().find(|entry| {
            if entry.key.len() != presented.len() {
                return false;
            }
            entry.key.as_bytes().ct_eq(presented.as_bytes()).into()
        })
    }
}

/// Extract API key from request headers
///
/// `X-API-Key` wins over `Authorization: Bearer <key>`.
fn extract_api_key(headers: &HeaderMap) -> Option<&str> {
    if let Some(key) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(key);
    }

    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Credential resolution middleware
pub async fn credential_middleware(
    keys: ApiKeys,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let entry = {
        let presented = extract_api_key(request.headers()).ok_or_else(|| {
            warn!("Missing API key in request to {}", request.uri().path());
            ApiError::Unauthorized(
                "Missing API key. Provide via Authorization: Bearer <key> or X-API-Key header"
                    .to_string(),
            )
        })?;

        keys.resolve(presented).cloned().ok_or_else(|| {
            warn!("Invalid API key for request to {}", request.uri().path());
            ApiError::Unauthorized("Invalid API key".to_string())
        })?
    };

    debug!(
        credential = %entry.credential,
        "API key resolved for {}",
        request.uri().path()
    );

    request.extensions_mut().insert(entry.credential);
    if let Some(permission) = entry.permission {
        request.extensions_mut().insert(permission);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::Extension,
        http::{Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn whoami(
        Extension(credential): Extension<Credential>,
        permission: Option<Extension<PermissionRecord>>,
    ) -> String {
        let origins = permission
            .map(|Extension(p)| p.allowed_origins.join(","))
            .unwrap_or_default();
        format!("{credential}:{origins}")
    }

    fn app() -> Router {
        let keys = ApiKeys::from_config(&[
            ApiKeyConfig {
                key: "user-key".to_string(),
                credential: Credential::User,
                allowed_origins: vec![],
            },
            ApiKeyConfig {
                key: "perm-key".to_string(),
                credential: Credential::Permission,
                allowed_origins: vec!["https://*.example.com".to_string()],
            },
        ]);

        Router::new()
            .route("/whoami", get(whoami))
            .layer(middleware::from_fn(move |req, next| {
                let keys = keys.clone();
                credential_middleware(keys, req, next)
            }))
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_missing_key() {
        let (status, _) = send(Request::builder().uri("/whoami").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_invalid_key() {
        let (status, _) = send(
            Request::builder()
                .uri("/whoami")
                .header("X-API-Key", "nope")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_user_key_via_header() {
        let (status, body) = send(
            Request::builder()
                .uri("/whoami")
                .header("X-API-Key", "user-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "user:");
    }

    #[tokio::test]
    async fn test_permission_key_via_bearer_carries_record() {
        let (status, body) = send(
            Request::builder()
                .uri("/whoami")
                .header("Authorization", "Bearer perm-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "permission:https://*.example.com");
    }

    #[test]
    fn test_resolve_requires_exact_key() {
        let keys = ApiKeys::from_config(&[ApiKeyConfig {
            key: "abc".to_string(),
            credential: Credential::User,
            allowed_origins: vec![],
        }]);
        assert_eq!(keys.len(), 1);
        assert!(keys.resolve("abc").is_some());
        assert!(keys.resolve("abcd").is_none());
        assert!(keys.resolve("ab").is_none());
    }
}
