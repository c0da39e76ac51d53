//! Result processing.
//!
//! Shapes the per-engine outcomes of a search into a [`SearchResponse`]:
//! per-engine lists capped at the result limit, a combined list in engine
//! order with optional URL de-duplication, and response metadata.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::Local;
use tracing::{debug, info, warn};

use crate::search::EngineOutcome;
use crate::{EngineResults, Result, SearchMetadata, SearchResponse, SearchResult};

/// Builds response envelopes from engine outcomes.
#[derive(Debug, Clone)]
pub struct Aggregator {
    results_limit: usize,
    instance_id: String,
    output_dir: Option<PathBuf>,
}

impl Aggregator {
    /// Creates a new aggregator keeping at most `results_limit` results per engine.
    pub fn new(results_limit: usize) -> Self {
        Self {
            results_limit,
            instance_id: "default".to_string(),
            output_dir: None,
        }
    }

    /// Sets the instance identifier reported in metadata.
    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        self.instance_id = instance_id.into();
        self
    }

    /// Enables writing raw per-engine results to `<dir>/debug/`.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Returns the per-engine result limit.
    pub fn results_limit(&self) -> usize {
        self.results_limit
    }

    /// Aggregates engine outcomes, in the order given.
    ///
    /// With `ignore_duplicates`, a URL already in the combined list is
    /// skipped; the first occurrence wins.
    pub fn aggregate(&self, query: &str, outcomes: Vec<EngineOutcome>, ignore_duplicates: bool) -> SearchResponse {
        let now = Local::now();
        let mut results_by_engine = Vec::with_capacity(outcomes.len());
        let mut combined_results: Vec<SearchResult> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut engines_used = Vec::with_capacity(outcomes.len());

        for EngineOutcome { engine, outcome } in outcomes {
            engines_used.push(engine.clone());

            let results = match outcome {
                Ok(results) => results,
                Err(e) => {
                    results_by_engine.push(EngineResults::failure(engine, e.to_string()));
                    continue;
                }
            };

            let kept: Vec<SearchResult> = results.into_iter().take(self.results_limit).collect();
            debug!("{} contributed {} results", engine, kept.len());

            for result in &kept {
                if ignore_duplicates && !seen.insert(result.url.clone()) {
                    continue;
                }
                combined_results.push(result.clone());
            }

            results_by_engine.push(EngineResults::success(engine, kept));
        }

        info!("Search completed. Total results: {}", combined_results.len());

        SearchResponse {
            query: query.to_string(),
            results_by_engine,
            total_results: combined_results.len(),
            combined_results,
            metadata: SearchMetadata {
                timestamp: now.format("%Y%m%d_%H%M%S").to_string(),
                instance_id: self.instance_id.clone(),
                engines_used,
                search_time: now.to_rfc3339(),
                ..Default::default()
            },
        }
    }

    /// Writes each successful engine's results to
    /// `<output_dir>/debug/<engine>_<timestamp>.json`.
    ///
    /// Does nothing unless an output directory is configured. Failures are
    /// logged and otherwise ignored.
    pub async fn save_debug_output(&self, response: &SearchResponse) {
        let Some(dir) = &self.output_dir else {
            return;
        };
        if let Err(e) = self.write_debug_files(dir, response).await {
            warn!("Could not save debug output: {}", e);
        }
    }

    async fn write_debug_files(&self, dir: &std::path::Path, response: &SearchResponse) -> Result<()> {
        let debug_dir = dir.join("debug");
        tokio::fs::create_dir_all(&debug_dir).await?;

        for entry in response.results_by_engine.iter().filter(|e| !e.is_failure()) {
            let path = debug_dir.join(format!("{}_{}.json", entry.engine, response.metadata.timestamp));
            let body = serde_json::to_vec_pretty(&entry.results)
                .map_err(|e| crate::SearchError::Other(format!("Failed to serialize results: {}", e)))?;
            tokio::fs::write(&path, body).await?;
            debug!("Saved raw {} results to {}", entry.engine, path.display());
        }
        Ok(())
    }
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new(10)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SearchError;

    fn ok(engine: &str, urls: &[&str]) -> EngineOutcome {
        EngineOutcome {
            engine: engine.to_string(),
            outcome: Ok(urls
                .iter()
                .map(|url| SearchResult::new(*url, format!("Title {}", url), "Snippet"))
                .collect()),
        }
    }

    fn failed(engine: &str) -> EngineOutcome {
        EngineOutcome {
            engine: engine.to_string(),
            outcome: Err(SearchError::Blocked(engine.to_string())),
        }
    }

    #[test]
    fn test_aggregate_empty() {
        let response = Aggregator::new(10).aggregate("q", vec![], true);
        assert!(response.items().is_empty());
        assert_eq!(response.total_results, 0);
        assert_eq!(response.query, "q");
    }

    #[test]
    fn test_aggregate_preserves_engine_order() {
        let response = Aggregator::new(10).aggregate(
            "q",
            vec![
                ok("google", &["https://a.com", "https://b.com"]),
                ok("bing", &["https://c.com"]),
            ],
            true,
        );
        let urls: Vec<_> = response.items().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com", "https://b.com", "https://c.com"]);
        assert_eq!(response.total_results, 3);
        assert_eq!(response.metadata.engines_used, vec!["google", "bing"]);
    }

    #[test]
    fn test_aggregate_deduplicates_by_url() {
        let response = Aggregator::new(10).aggregate(
            "q",
            vec![
                ok("google", &["https://a.com", "https://b.com"]),
                ok("bing", &["https://b.com", "https://c.com"]),
            ],
            true,
        );
        let urls: Vec<_> = response.items().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a.com", "https://b.com", "https://c.com"]);
        // Per-engine lists are untouched by de-duplication.
        assert_eq!(response.results_by_engine[1].total_results, 2);
    }

    #[test]
    fn test_aggregate_keeps_duplicates_when_asked() {
        let response = Aggregator::new(10).aggregate(
            "q",
            vec![ok("google", &["https://a.com"]), ok("bing", &["https://a.com"])],
            false,
        );
        assert_eq!(response.items().len(), 2);
    }

    #[test]
    fn test_aggregate_applies_results_limit() {
        let response = Aggregator::new(2).aggregate(
            "q",
            vec![ok("google", &["https://a.com", "https://b.com", "https://c.com"])],
            true,
        );
        assert_eq!(response.results_by_engine[0].results.len(), 2);
        assert_eq!(response.items().len(), 2);
    }

    #[test]
    fn test_aggregate_reports_failed_engine() {
        let response = Aggregator::new(10).aggregate(
            "q",
            vec![ok("google", &["https://a.com"]), failed("yahoo")],
            true,
        );
        assert_eq!(response.results_by_engine.len(), 2);
        let yahoo = &response.results_by_engine[1];
        assert!(yahoo.is_failure());
        assert!(yahoo.results.is_empty());
        assert!(yahoo.error.as_deref().unwrap().contains("yahoo"));
        assert_eq!(response.items().len(), 1);
    }

    #[test]
    fn test_aggregate_metadata() {
        let response = Aggregator::new(10)
            .with_instance_id("node-7")
            .aggregate("q", vec![ok("google", &[])], true);
        assert_eq!(response.metadata.instance_id, "node-7");
        assert_eq!(response.metadata.timestamp.len(), 15);
        assert!(chrono::DateTime::parse_from_rfc3339(&response.metadata.search_time).is_ok());
    }

    #[tokio::test]
    async fn test_save_debug_output_without_dir_is_noop() {
        let aggregator = Aggregator::new(10);
        let response = aggregator.aggregate("q", vec![ok("google", &["https://a.com"])], true);
        aggregator.save_debug_output(&response).await;
    }

    #[tokio::test]
    async fn test_save_debug_output_writes_files() {
        let dir = std::env::temp_dir().join(format!("search-gateway-debug-{}", std::process::id()));
        let aggregator = Aggregator::new(10).with_output_dir(&dir);
        let response = aggregator.aggregate(
            "q",
            vec![ok("google", &["https://a.com"]), failed("bing")],
            true,
        );

        aggregator.save_debug_output(&response).await;

        let expected = dir
            .join("debug")
            .join(format!("google_{}.json", response.metadata.timestamp));
        let body = tokio::fs::read_to_string(&expected).await.unwrap();
        assert!(body.contains("https://a.com"));
        let bing = dir
            .join("debug")
            .join(format!("bing_{}.json", response.metadata.timestamp));
        assert!(!bing.exists());

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
