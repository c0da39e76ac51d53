//! Search result types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single search result, as scraped from an engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Result title.
    pub title: String,
    /// Result URL.
    pub url: String,
    /// Result snippet.
    #[serde(rename = "description")]
    pub snippet: String,
}

impl SearchResult {
    /// Creates a new search result.
    pub fn new(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            snippet: snippet.into(),
        }
    }
}

/// Results produced by one engine for one query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineResults {
    /// Engine name.
    pub engine: String,
    /// Results in engine order.
    pub results: Vec<SearchResult>,
    /// Number of results kept for this engine.
    pub total_results: usize,
    /// Error message when the engine failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl EngineResults {
    /// Creates a successful engine entry.
    pub fn success(engine: impl Into<String>, results: Vec<SearchResult>) -> Self {
        Self {
            engine: engine.into(),
            total_results: results.len(),
            results,
            error: None,
        }
    }

    /// Creates an entry for an engine that failed.
    pub fn failure(engine: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            engine: engine.into(),
            results: Vec::new(),
            total_results: 0,
            error: Some(error.into()),
        }
    }

    /// Returns whether the engine failed.
    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }
}

/// Descriptive data attached to every response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    /// Compact local timestamp, `%Y%m%d_%H%M%S`.
    pub timestamp: String,
    /// Identifier of the gateway instance that served the request.
    pub instance_id: String,
    /// Search mode.
    pub mode: String,
    /// Engines that were queried, in request order.
    pub engines_used: Vec<String>,
    /// RFC 3339 time the search finished.
    pub search_time: String,
    /// Number of pages requested per engine.
    pub pages: u32,
    /// Search duration in milliseconds.
    pub duration_ms: u64,
    /// Mode inputs (e.g. `domain`, `full_name`).
    #[serde(flatten)]
    pub inputs: BTreeMap<String, String>,
}

/// Full response envelope for a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// The engine query string that was executed.
    pub query: String,
    /// Results grouped by engine.
    pub results_by_engine: Vec<EngineResults>,
    /// Results from all engines, in engine order.
    pub combined_results: Vec<SearchResult>,
    /// Number of combined results.
    pub total_results: usize,
    /// Additional information about the search.
    pub metadata: SearchMetadata,
}

impl SearchResponse {
    /// Returns the combined results.
    pub fn items(&self) -> &[SearchResult] {
        &self.combined_results
    }

    /// Consumes the response, returning the combined results.
    pub fn into_items(self) -> Vec<SearchResult> {
        self.combined_results
    }
}
