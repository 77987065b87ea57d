//! Audit log read handlers

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::debug;

use crate::{error::ApiError, state::AppState};

/// Pagination parameters, kept as raw strings so parse failures name the parameter.
#[derive(Debug, Default, Deserialize)]
pub struct LogsQuery {
    pub from: Option<String>,
    pub size: Option<String>,
}

/// GET /_logs - newest audit records across all resources
pub async fn get_logs(
    State(state): State<AppState>,
    Query(params): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    serve_logs(&state, params, Vec::new()).await
}

/// GET /_logs/:indices - newest audit records touching every listed resource
pub async fn get_index_logs(
    State(state): State<AppState>,
    Path(indices): Path<String>,
    Query(params): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let filter = indices
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    serve_logs(&state, params, filter).await
}

async fn serve_logs(
    state: &AppState,
    params: LogsQuery,
    filter: Vec<String>,
) -> Result<Response, ApiError> {
    let from = params.from.unwrap_or_else(|| "0".to_string());
    let size = params
        .size
        .unwrap_or_else(|| state.default_size.to_string());

    debug!(from = %from, size = %size, filter = ?filter, "reading audit logs");

    let body = state.store.query(&from, &size, &filter).await?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
