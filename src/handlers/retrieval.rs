// ---------------------------------------------------------------------------
// handlers/retrieval.rs — GET / (search) and GET /r/<url> (single page)
// ---------------------------------------------------------------------------

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, RawQuery, State};
use axum::Json;

use crate::models::{SearchEntry, SearchParams, RETRIEVAL_FAILED};
use crate::state::AppState;

use super::ApiError;

#[utoipa::path(get, path = "/", tag = "retrieval",
    params(
        ("q" = String, Query, description = "Search query"),
        ("num_results" = Option<usize>, Query, description = "Number of results (default 5)")
    ),
    responses(
        (status = 200, description = "Retrieved results in ranking order, or a single error entry", body = Vec<SearchEntry>),
        (status = 400, description = "Missing or malformed query parameters")
    )
)]
pub async fn search_results(
    State(state): State<AppState>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> Result<Json<Vec<SearchEntry>>, ApiError> {
    let Query(params) = params.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    tracing::info!(num_results = params.num_results, "search request");
    Ok(Json(state.search.search(&params.q, params.num_results).await))
}

#[utoipa::path(get, path = "/r/{url}", tag = "retrieval",
    params(("url" = String, Path, description = "Absolute URL to retrieve, scheme included")),
    responses((status = 200, description = "Formatted Markdown document, or the failure sentinel", body = String, content_type = "text/plain"))
)]
pub async fn read_url(
    State(state): State<AppState>,
    Path(url): Path<String>,
    RawQuery(query): RawQuery,
) -> String {
    let url = target_url(url, query);
    match state.pipeline.retrieve(&url).await {
        Ok(doc) => doc.formatted(),
        Err(e) => {
            tracing::warn!(url = %url, "retrieval failed: {}", e);
            RETRIEVAL_FAILED.to_string()
        }
    }
}

/// The wildcard captures only the path, so a query string on the target
/// arrives separately and is stitched back on.
pub(crate) fn target_url(path: String, query: Option<String>) -> String {
    match query {
        Some(q) if !q.is_empty() => format!("{}?{}", path, q),
        _ => path,
    }
}
