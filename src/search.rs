//! Search orchestration.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::throttle::RequestThrottler;
use crate::{Engine, Result, SearchError, SearchQuery, SearchResult};

/// What one engine produced for a query.
#[derive(Debug)]
pub struct EngineOutcome {
    /// Engine name.
    pub engine: String,
    /// Results across all fetched pages, or the error the engine failed with.
    pub outcome: Result<Vec<SearchResult>>,
}

impl EngineOutcome {
    /// Returns whether the engine failed.
    pub fn is_failure(&self) -> bool {
        self.outcome.is_err()
    }
}

/// Runs one query against a set of engines.
///
/// Engines run concurrently up to `max_concurrent` at a time, each bounded
/// by `timeout`. Outcomes are returned in engine selection order regardless
/// of completion order.
pub struct Search {
    engines: Vec<Arc<dyn Engine>>,
    throttler: Arc<RequestThrottler>,
    default_timeout: Duration,
    max_concurrent: usize,
}

impl Search {
    /// Creates a new search instance.
    pub fn new() -> Self {
        Self {
            engines: Vec::new(),
            throttler: Arc::new(RequestThrottler::disabled()),
            default_timeout: Duration::from_secs(30),
            max_concurrent: 5,
        }
    }

    /// Adds a search engine.
    pub fn add_engine<E: Engine + 'static>(&mut self, engine: E) {
        self.engines.push(Arc::new(engine));
    }

    /// Adds an already shared search engine.
    pub fn add_shared_engine(&mut self, engine: Arc<dyn Engine>) {
        self.engines.push(engine);
    }

    /// Sets the per-engine timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.default_timeout = timeout;
    }

    /// Sets how many engines may run at once. `1` runs them sequentially.
    pub fn set_max_concurrent(&mut self, max_concurrent: usize) {
        self.max_concurrent = max_concurrent.max(1);
    }

    /// Sets the throttler that spaces out requests per engine.
    pub fn set_throttler(&mut self, throttler: Arc<RequestThrottler>) {
        self.throttler = throttler;
    }

    /// Returns the number of configured engines.
    pub fn engine_count(&self) -> usize {
        self.engines.len()
    }

    /// Returns the names of the enabled engines, in registration order.
    pub fn engine_names(&self) -> Vec<String> {
        self.engines
            .iter()
            .filter(|engine| engine.is_enabled())
            .map(|engine| engine.name().to_string())
            .collect()
    }

    /// Runs `query` for `pages` pages on the engines named in `engines`
    /// (all enabled engines when empty).
    ///
    /// Engine failures are reported in the outcomes, not as an error; the
    /// call itself fails only for invalid input.
    pub async fn search(&self, query: &str, engines: &[String], pages: u32) -> Result<Vec<EngineOutcome>> {
        if self.engines.is_empty() {
            return Err(SearchError::NoEngines);
        }

        if query.trim().is_empty() {
            return Err(SearchError::InvalidQuery("Query cannot be empty".into()));
        }

        let selected = self.select_engines(engines)?;
        if selected.is_empty() {
            return Err(SearchError::NoEngines);
        }

        let start = Instant::now();
        let pages = pages.max(1);
        info!("Searching {} engines, {} page(s)", selected.len(), pages);
        debug!("Query: {}", query);

        let runs: Vec<_> = selected
            .into_iter()
            .map(|engine| self.run_engine(engine, query, pages))
            .collect();
        let outcomes: Vec<EngineOutcome> = stream::iter(runs)
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let failed = outcomes.iter().filter(|o| o.is_failure()).count();
        info!(
            "Search finished in {:?}: {} engine(s) ok, {} failed",
            start.elapsed(),
            outcomes.len() - failed,
            failed
        );

        Ok(outcomes)
    }

    async fn run_engine(&self, engine: Arc<dyn Engine>, query: &str, pages: u32) -> EngineOutcome {
        let name = engine.name().to_string();
        let start = Instant::now();

        let outcome = match timeout(self.default_timeout, self.fetch_pages(engine.as_ref(), query, pages)).await {
            Ok(Ok(results)) => {
                debug!("Engine {} returned {} results in {:?}", name, results.len(), start.elapsed());
                Ok(results)
            }
            Ok(Err(e)) => {
                warn!("Engine {} failed: {}", name, e);
                Err(e)
            }
            Err(_) => {
                warn!("Engine {} timed out after {:?}", name, self.default_timeout);
                Err(SearchError::Timeout)
            }
        };

        EngineOutcome { engine: name, outcome }
    }

    /// Fetches pages in order, stopping at the first empty page.
    ///
    /// A failure on a later page keeps the results already collected.
    async fn fetch_pages(&self, engine: &dyn Engine, query: &str, pages: u32) -> Result<Vec<SearchResult>> {
        let mut collected = Vec::new();

        for page in 1..=pages {
            self.throttler.throttle(engine.name()).await;

            let page_query = SearchQuery::new(query).with_page(page);
            let results = match engine.search(&page_query).await {
                Ok(results) => results,
                Err(e) if page > 1 => {
                    warn!("Engine {} failed on page {}: {}", engine.name(), page, e);
                    break;
                }
                Err(e) => return Err(e),
            };

            if results.is_empty() {
                debug!("Engine {} has no results on page {}", engine.name(), page);
                break;
            }
            collected.extend(results);

            if !engine.supports_paging() {
                break;
            }
        }

        Ok(collected)
    }

    /// Resolves requested engine names (or shortcuts) to enabled engines.
    fn select_engines(&self, requested: &[String]) -> Result<Vec<Arc<dyn Engine>>> {
        if requested.is_empty() {
            return Ok(self
                .engines
                .iter()
                .filter(|engine| engine.is_enabled())
                .cloned()
                .collect());
        }

        let mut selected: Vec<Arc<dyn Engine>> = Vec::new();
        for wanted in requested {
            let wanted = wanted.trim().to_ascii_lowercase();
            let engine = self
                .engines
                .iter()
                .find(|engine| engine.name() == wanted || engine.shortcut() == wanted)
                .ok_or_else(|| SearchError::UnknownEngine(wanted.clone()))?;

            if !engine.is_enabled() {
                debug!("Skipping disabled engine {}", engine.name());
                continue;
            }
            if selected.iter().any(|e| e.name() == engine.name()) {
                continue;
            }
            selected.push(Arc::clone(engine));
        }
        Ok(selected)
    }
}

impl Default for Search {
    fn default() -> Self {
        Self::new()
    }
}
