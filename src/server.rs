//! HTTP API layer.
//!
//! Thin axum router over the pipeline and stores: request validation, status
//! mapping, and CORS only. No business logic lives here.

use crate::extract::ExtractError;
use crate::history::{HistoryError, HistoryStore, HistoryWithStyle};
use crate::pipeline::{Pipeline, PipelineError};
use crate::style::{NewStyle, Style, StyleError, StyleStore};
use axum::extract::{Path, Query, State};
use axum::http::{header, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

const DEFAULT_LIMIT: usize = 10;

/// Shared handles injected into every handler
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub styles: Arc<StyleStore>,
    pub history: Arc<HistoryStore>,
}

#[derive(Debug, Deserialize)]
pub struct SummarizeRequest {
    pub url: String,
    #[serde(default)]
    pub style: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummarizeResponse {
    pub summary: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// History record as rendered at the API boundary
#[derive(Debug, Serialize)]
pub struct HistoryView {
    pub id: String,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub style: Option<String>,
    pub language: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryListResponse {
    pub histories: Vec<HistoryView>,
    pub total_size: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Build the application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        .route("/api/summarize", post(summarize))
        .route("/api/history", get(get_history))
        .route("/api/history/{id}", get(get_history_by_id))
        .route("/api/search", get(search))
        .route("/api/styles", get(list_styles).post(create_style))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, port: u16) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("server listening on {addr}");
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn summarize(
    State(state): State<AppState>,
    Json(request): Json<SummarizeRequest>,
) -> Result<Json<SummarizeResponse>, ApiError> {
    if request.url.trim().is_empty() {
        return Err(bad_request("url is required"));
    }

    let result = state
        .pipeline
        .run(&request.url, request.style.as_deref())
        .await
        .map_err(pipeline_error)?;

    Ok(Json(SummarizeResponse {
        summary: result.summary,
        title: result.title,
        url: result.url,
    }))
}

async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<HistoryListResponse>, ApiError> {
    let (limit, offset) = page_params(query.limit.as_deref(), query.offset.as_deref());

    let histories = state
        .history
        .list_with_styles(limit, offset)
        .map_err(internal_error)?;
    let total_size = state.history.count();

    Ok(Json(HistoryListResponse {
        histories: histories.into_iter().map(history_view).collect(),
        total_size,
    }))
}

async fn get_history_by_id(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<HistoryView>, ApiError> {
    match state.history.get_with_style(id) {
        Ok(joined) => Ok(Json(history_view(joined))),
        Err(HistoryError::NotFound(_)) => Err((
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: "history not found".to_string(),
            }),
        )),
        Err(e) => Err(internal_error(e)),
    }
}

async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<HistoryView>>, ApiError> {
    let q = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q,
        _ => return Err(bad_request("search query is required")),
    };
    let (limit, offset) = page_params(query.limit.as_deref(), query.offset.as_deref());

    let results = state
        .history
        .search(q, limit, offset)
        .map_err(internal_error)?;

    let views = results
        .into_iter()
        .map(|record| {
            history_view(HistoryWithStyle {
                record,
                style: None,
            })
        })
        .collect();
    Ok(Json(views))
}

async fn list_styles(State(state): State<AppState>) -> Result<Json<Vec<Style>>, ApiError> {
    state.styles.list().map(Json).map_err(internal_error)
}

async fn create_style(
    State(state): State<AppState>,
    Json(new): Json<NewStyle>,
) -> Result<(StatusCode, Json<Style>), ApiError> {
    match state.styles.create(new) {
        Ok(style) => Ok((StatusCode::CREATED, Json(style))),
        Err(StyleError::Invalid(msg)) => Err(bad_request(&msg)),
        Err(e) => Err(internal_error(e)),
    }
}

/// Parse limit/offset, falling back to defaults on invalid or non-positive values
fn page_params(limit: Option<&str>, offset: Option<&str>) -> (usize, usize) {
    let limit = limit
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v as usize)
        .unwrap_or(DEFAULT_LIMIT);
    let offset = offset
        .and_then(|v| v.parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .map(|v| v as usize)
        .unwrap_or(0);
    (limit, offset)
}

fn history_view(joined: HistoryWithStyle) -> HistoryView {
    HistoryView {
        id: joined.record.id.to_string(),
        url: joined.record.url,
        title: joined.record.title.unwrap_or_default(),
        summary: joined.record.summary,
        style: joined.style.map(|s| s.name),
        language: joined.record.language,
        created_at: joined.record.created_at.to_rfc3339(),
    }
}

/// Map a pipeline failure to a status code and a single descriptive message
fn pipeline_error(err: PipelineError) -> ApiError {
    let status = match &err {
        PipelineError::Extract(ExtractError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
        PipelineError::UnknownStyle(_) => StatusCode::NOT_FOUND,
        PipelineError::Extract(_) | PipelineError::Summarize(_) => StatusCode::BAD_GATEWAY,
        PipelineError::StyleLookup(_) | PipelineError::Persist(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    tracing::error!("summarisation failed: {err}");
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

fn internal_error(err: impl std::fmt::Display) -> ApiError {
    tracing::error!("request failed: {err}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: err.to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_params_defaults() {
        assert_eq!(page_params(None, None), (10, 0));
    }

    #[test]
    fn page_params_parses_valid_values() {
        assert_eq!(page_params(Some("25"), Some("50")), (25, 50));
    }

    #[test]
    fn page_params_falls_back_on_invalid_values() {
        assert_eq!(page_params(Some("abc"), Some("-1")), (10, 0));
        assert_eq!(page_params(Some("0"), Some("oops")), (10, 0));
        assert_eq!(page_params(Some("-5"), None), (10, 0));
    }
}
