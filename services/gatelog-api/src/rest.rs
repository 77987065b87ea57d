use crate::{
    handlers::{get_index_logs, get_logs},
    middleware::{credential_middleware, record_request, referer_middleware, ApiKeys},
    state::AppState,
};
use axum::{extract::Request, middleware, response::Response, routing::get, Router};
use tower_http::{classify::ServerErrorsFailureClass, trace::TraceLayer};
use tracing::{info_span, Span};
use uuid::Uuid;

/// Builds the Axum router.
///
/// Layering, outermost first:
/// - every route: request tracing
/// - `/_logs*` and `protected`: credential resolution (skipped when `api_keys`
///   is `None`, in which case an outer layer must insert the credential)
/// - `protected`: request recording into the audit store
/// - `/_logs*` and `protected`: referer gate
///
/// `/health` is served outside every gate.
pub fn build_router(state: AppState, protected: Router, api_keys: Option<ApiKeys>) -> Router {
    let gate = state.matchers.clone();
    let logs_gate = gate.clone();
    let store = state.store.clone();

    let admin = Router::new()
        .route("/_logs", get(get_logs))
        .route("/_logs/:indices", get(get_index_logs))
        .with_state(state)
        .layer(middleware::from_fn(move |req, next| {
            let matchers = logs_gate.clone();
            referer_middleware(matchers, req, next)
        }));

    let protected = protected
        .layer(middleware::from_fn(move |req, next| {
            let matchers = gate.clone();
            referer_middleware(matchers, req, next)
        }))
        .layer(middleware::from_fn(move |req, next| {
            let store = store.clone();
            record_request(store, req, next)
        }));

    let mut secured = admin.merge(protected);
    if let Some(keys) = api_keys {
        secured = secured.layer(middleware::from_fn(move |req, next| {
            let keys = keys.clone();
            credential_middleware(keys, req, next)
        }));
    }

    Router::new()
        .route("/health", get(health_check))
        .merge(secured)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &Request| {
                    let request_id = Uuid::new_v4();
                    info_span!(
                        "http_request",
                        request_id = %request_id,
                        method = %request.method(),
                        uri = %request.uri(),
                        version = ?request.version(),
                    )
                })
                .on_request(|_request: &Request, _span: &Span| {
                    tracing::debug!("started processing request");
                })
                .on_response(|response: &Response, latency: std::time::Duration, _span: &Span| {
                    let status = response.status();
                    let latency_ms = latency.as_millis();

                    if status.is_server_error() {
                        tracing::error!(status = %status, latency_ms = latency_ms, "request failed with server error");
                    } else if status.is_client_error() {
                        tracing::warn!(status = %status, latency_ms = latency_ms, "request failed with client error");
                    } else {
                        tracing::info!(status = %status, latency_ms = latency_ms, "request completed");
                    }
                })
                .on_failure(|failure_class: ServerErrorsFailureClass, latency: std::time::Duration, _span: &Span| {
                    tracing::error!(failure_class = ?failure_class, latency_ms = latency.as_millis(), "request failed");
                }),
        )
}

async fn health_check() -> &'static str {
    "ok"
}
