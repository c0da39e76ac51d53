use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::{SearchError, SearchMode, SearchOptions, SearchTarget};

/// Engine selection as sent by clients: `google,bing` in query strings or a
/// JSON list in request bodies.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EngineList {
    List(Vec<String>),
    Csv(String),
}

impl EngineList {
    pub fn into_names(self) -> Vec<String> {
        let names = match self {
            Self::List(names) => names,
            Self::Csv(csv) => csv.split(',').map(str::to_string).collect(),
        };
        names
            .into_iter()
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// Search request, read from the query string (GET) or the JSON body (POST).
///
/// Which input fields are required depends on the route.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub company_name: Option<String>,
    pub domain: Option<String>,
    pub full_name: Option<String>,
    pub engines: Option<EngineList>,
    pub pages: Option<u32>,
    pub ignore_duplicates: Option<bool>,
    pub use_proxy: Option<bool>,
}

impl SearchRequest {
    /// Builds the search target for `mode`, checking its fields are present.
    pub fn target(&self, mode: SearchMode) -> Result<SearchTarget, SearchError> {
        Ok(match mode {
            SearchMode::Simple => SearchTarget::Simple {
                query: required("query", &self.query)?,
            },
            SearchMode::Company => SearchTarget::Company {
                company_name: required("company_name", &self.company_name)?,
            },
            SearchMode::Domain => SearchTarget::Domain {
                domain: required("domain", &self.domain)?,
            },
            SearchMode::Full => SearchTarget::Full {
                full_name: required("full_name", &self.full_name)?,
                domain: required("domain", &self.domain)?,
            },
        })
    }

    pub fn options(&self) -> SearchOptions {
        SearchOptions {
            engines: self.engines.clone().map(EngineList::into_names).unwrap_or_default(),
            pages: self.pages,
            ignore_duplicates: self.ignore_duplicates.unwrap_or(true),
            use_proxy: self.use_proxy,
        }
    }
}

fn required(field: &str, value: &Option<String>) -> Result<String, SearchError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.clone()),
        _ => Err(SearchError::InvalidQuery(format!("{} is required", field))),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EngineInfo {
    pub name: String,
    pub description: Option<String>,
    pub default: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EnginesResponse {
    pub engines: Vec<EngineInfo>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Message returned for every failure that is not the client's fault.
pub const GENERIC_ERROR: &str = "An error occurred during the search operation";

/// An error response with a `{"detail": ...}` body.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub detail: String,
}

impl ApiError {
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            detail: detail.into(),
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        if err.is_client_error() {
            warn!("Validation error: {}", err);
            return Self::bad_request(err.to_string());
        }

        error!("Search failed: {}", err);
        let status = match err {
            SearchError::AllEnginesFailed(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            detail: GENERIC_ERROR.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { detail: self.detail })).into_response()
    }
}
