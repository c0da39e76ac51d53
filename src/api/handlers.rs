use std::str::FromStr;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::Json;
use tracing::info;

use crate::engines::EngineKind;
use crate::{SearchMode, SearchResponse, SearchResult};

use super::models::{ApiError, EngineInfo, EnginesResponse, HealthResponse, SearchRequest};
use super::AppState;

type QueryParams = Result<Query<SearchRequest>, QueryRejection>;
type JsonBody = Result<Json<SearchRequest>, JsonRejection>;
type ApiResult<T> = Result<Json<T>, ApiError>;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: format!("{} is running", state.project_name),
    })
}

pub async fn list_engines(State(state): State<AppState>) -> Json<EnginesResponse> {
    let defaults = state.gateway.default_engines();
    let engines = state
        .gateway
        .engine_names()
        .into_iter()
        .map(|name| {
            let kind = EngineKind::from_str(&name).ok();
            let default = defaults.iter().any(|d| {
                d.eq_ignore_ascii_case(&name) || kind.is_some_and(|k| EngineKind::from_str(d).ok() == Some(k))
            });
            EngineInfo {
                description: kind.map(|kind| kind.description().to_string()),
                default,
                name,
            }
        })
        .collect();
    Json(EnginesResponse { engines })
}

pub async fn simple_search(state: State<AppState>, params: QueryParams) -> ApiResult<Vec<SearchResult>> {
    search_items(state, SearchMode::Simple, params).await
}

pub async fn simple_search_full(state: State<AppState>, body: JsonBody) -> ApiResult<SearchResponse> {
    search_envelope(state, SearchMode::Simple, body).await
}

pub async fn company_search(state: State<AppState>, params: QueryParams) -> ApiResult<Vec<SearchResult>> {
    search_items(state, SearchMode::Company, params).await
}

pub async fn company_search_full(state: State<AppState>, body: JsonBody) -> ApiResult<SearchResponse> {
    search_envelope(state, SearchMode::Company, body).await
}

pub async fn domain_search(state: State<AppState>, params: QueryParams) -> ApiResult<Vec<SearchResult>> {
    search_items(state, SearchMode::Domain, params).await
}

pub async fn domain_search_full(state: State<AppState>, body: JsonBody) -> ApiResult<SearchResponse> {
    search_envelope(state, SearchMode::Domain, body).await
}

pub async fn full_search(state: State<AppState>, params: QueryParams) -> ApiResult<Vec<SearchResult>> {
    search_items(state, SearchMode::Full, params).await
}

pub async fn full_search_full(state: State<AppState>, body: JsonBody) -> ApiResult<SearchResponse> {
    search_envelope(state, SearchMode::Full, body).await
}

/// GET flavour: the combined results only.
async fn search_items(
    State(state): State<AppState>,
    mode: SearchMode,
    params: QueryParams,
) -> ApiResult<Vec<SearchResult>> {
    let Query(request) = params.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let response = run(&state, mode, &request).await?;
    Ok(Json(response.into_items()))
}

/// POST flavour: the full envelope.
async fn search_envelope(
    State(state): State<AppState>,
    mode: SearchMode,
    body: JsonBody,
) -> ApiResult<SearchResponse> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;
    Ok(Json(run(&state, mode, &request).await?))
}

async fn run(state: &AppState, mode: SearchMode, request: &SearchRequest) -> Result<SearchResponse, ApiError> {
    let target = request.target(mode)?;
    info!("{} search request received", mode);
    let response = state.gateway.search(&target, &request.options()).await?;
    Ok(response)
}
