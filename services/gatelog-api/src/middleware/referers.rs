//! Referer whitelist gate for permission credentials.

use axum::{
    extract::Request,
    http::header,
    middleware::Next,
    response::Response,
};
use gatelog_core::{CoreError, Credential, MatcherCache, PermissionRecord};
use tracing::{debug, error, warn};

use crate::error::ApiError;

pub const MISSING_REFERER_MESSAGE: &str =
    "failed to identify request domain, empty header: Referer";

pub const UNMATCHED_REFERER_MESSAGE: &str = "permission doesn't have required referers";

/// Referer gate middleware
///
/// Expects an upstream layer to have placed a [`Credential`] (and, for
/// permission credentials, a [`PermissionRecord`]) in the request extensions.
///
/// - Non-permission credentials pass straight through.
/// - A missing or empty `Referer` is rejected with 401.
/// - A `Referer` matching none of `allowed_origins` is rejected with 403.
/// - Missing context values or uncompilable patterns are rejected with 500.
pub async fn referer_middleware(
    matchers: MatcherCache,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let credential = request
        .extensions()
        .get::<Credential>()
        .copied()
        .ok_or_else(|| context_error("credential"))?;

    if !credential.requires_referer() {
        return Ok(next.run(request).await);
    }

    // Non-ASCII bytes are still a present header; decode lossily and let the patterns decide.
    let referer = request
        .headers()
        .get(header::REFERER)
        .filter(|v| !v.is_empty())
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .ok_or_else(|| {
            warn!("Missing Referer for permission request to {}", request.uri().path());
            ApiError::Unauthorized(MISSING_REFERER_MESSAGE.to_string())
        })?;

    let permission = request
        .extensions()
        .get::<PermissionRecord>()
        .ok_or_else(|| context_error("permission"))?;

    match matchers.find_match(&permission.allowed_origins, &referer) {
        Ok(Some(position)) => {
            debug!(
                referer = %referer,
                pattern = %permission.allowed_origins[position],
                "referer validated"
            );
        }
        Ok(None) => {
            warn!(referer = %referer, "referer not in permission whitelist");
            return Err(ApiError::Forbidden(UNMATCHED_REFERER_MESSAGE.to_string()));
        }
        Err(e) => {
            error!(referer = %referer, error = %e, "failed to evaluate referer patterns");
            return Err(e.into());
        }
    }

    Ok(next.run(request).await)
}

fn context_error(what: &'static str) -> ApiError {
    let err = CoreError::context(what);
    error!(error = %err, "request context incomplete");
    err.into()
}
