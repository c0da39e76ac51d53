//! The search gateway: turns a search intent into an engine query, runs it
//! and shapes the response.

use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use crate::config::Settings;
use crate::engines::EngineKind;
use crate::fetcher::PageFetcher;
use crate::fetcher_http::HttpFetcher;
use crate::proxy::ProxyPool;
use crate::search::EngineOutcome;
use crate::throttle::RequestThrottler;
use crate::user_agent::{user_agents, UserAgentPolicy};
use crate::{Aggregator, Result, Search, SearchError, SearchResponse, SearchTarget};

/// Per-request knobs shared by every search mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    /// Engines to query by name or shortcut. Empty means the gateway default.
    pub engines: Vec<String>,
    /// Pages per engine. `None` means one page.
    pub pages: Option<u32>,
    /// Skip combined results whose URL was already seen.
    pub ignore_duplicates: bool,
    /// Route through the proxy pool. `None` means the gateway default.
    pub use_proxy: Option<bool>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            engines: Vec::new(),
            pages: None,
            ignore_duplicates: true,
            use_proxy: None,
        }
    }
}

impl SearchOptions {
    /// Creates default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the engines to query.
    pub fn with_engines<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.engines = engines.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the number of pages per engine.
    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    /// Sets whether duplicate URLs are dropped from the combined results.
    pub fn with_ignore_duplicates(mut self, ignore_duplicates: bool) -> Self {
        self.ignore_duplicates = ignore_duplicates;
        self
    }

    /// Sets whether the proxy pool is used.
    pub fn with_proxy(mut self, use_proxy: bool) -> Self {
        self.use_proxy = Some(use_proxy);
        self
    }
}

/// Entry point for all four search modes.
pub struct SearchGateway {
    direct: Search,
    proxied: Option<Search>,
    aggregator: Aggregator,
    default_engines: Vec<String>,
    max_search_pages: u32,
    use_proxy: bool,
}

impl SearchGateway {
    /// Creates a gateway over an already configured orchestrator.
    ///
    /// Requests that name no engines use every enabled engine of `search`.
    pub fn new(search: Search, aggregator: Aggregator) -> Self {
        Self {
            direct: search,
            proxied: None,
            aggregator,
            default_engines: Vec::new(),
            max_search_pages: 1,
            use_proxy: false,
        }
    }

    /// Builds the gateway with HTTP engines, throttling and proxies from settings.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        settings.validate()?;

        let throttler = Arc::new(RequestThrottler::new(
            settings.min_request_delay,
            settings.max_request_delay,
            settings.use_random_delays,
        ));
        let user_agent = if settings.use_user_agent_rotation {
            UserAgentPolicy::Rotate
        } else {
            UserAgentPolicy::Fixed(user_agents()[0].to_string())
        };

        let direct_fetcher = HttpFetcher::new(settings.search_timeout)?.with_user_agent(user_agent.clone());
        let direct = engine_search(settings, Arc::new(direct_fetcher), Arc::clone(&throttler));

        let proxies = settings.proxies()?;
        let proxied = if proxies.is_empty() {
            None
        } else {
            info!("Proxy pool configured with {} proxies", proxies.len());
            let pool = Arc::new(ProxyPool::with_proxies(proxies).with_strategy(settings.proxy_strategy));
            let fetcher = HttpFetcher::new(settings.search_timeout)?
                .with_user_agent(user_agent)
                .with_proxy_pool(pool);
            Some(engine_search(settings, Arc::new(fetcher), throttler))
        };

        let mut aggregator = Aggregator::new(settings.results_limit).with_instance_id(&settings.instance_id);
        if let Some(dir) = &settings.output_dir {
            aggregator = aggregator.with_output_dir(dir);
        }

        Ok(Self {
            direct,
            proxied,
            aggregator,
            default_engines: settings.default_engines.clone(),
            max_search_pages: settings.max_search_pages,
            use_proxy: settings.use_proxy,
        })
    }

    /// Uses `search` for requests that ask for a proxy.
    pub fn with_proxied_search(mut self, search: Search) -> Self {
        self.proxied = Some(search);
        self
    }

    /// Sets the engines used when a request names none.
    pub fn with_default_engines<I, S>(mut self, engines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_engines = engines.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the upper bound for requested pages.
    pub fn with_max_search_pages(mut self, max_search_pages: u32) -> Self {
        self.max_search_pages = max_search_pages.max(1);
        self
    }

    /// Sets whether requests use the proxy pool unless they say otherwise.
    pub fn with_proxy_default(mut self, use_proxy: bool) -> Self {
        self.use_proxy = use_proxy;
        self
    }

    /// Names of the engines requests may select.
    pub fn engine_names(&self) -> Vec<String> {
        self.direct.engine_names()
    }

    /// Engines used when a request names none.
    pub fn default_engines(&self) -> Vec<String> {
        if self.default_engines.is_empty() {
            self.engine_names()
        } else {
            self.default_engines.clone()
        }
    }

    /// Searches for a raw query.
    pub async fn simple_search(&self, query: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let target = SearchTarget::Simple {
            query: query.to_string(),
        };
        self.search(&target, options).await
    }

    /// Searches for a company name and its contact/team pages.
    pub async fn search_by_company(&self, company_name: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let target = SearchTarget::Company {
            company_name: company_name.to_string(),
        };
        self.search(&target, options).await
    }

    /// Searches for pages on or mentioning a domain.
    pub async fn search_by_domain(&self, domain: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let target = SearchTarget::Domain {
            domain: domain.to_string(),
        };
        self.search(&target, options).await
    }

    /// Searches for a person at a company domain.
    pub async fn full_search(&self, full_name: &str, domain: &str, options: &SearchOptions) -> Result<SearchResponse> {
        let target = SearchTarget::Full {
            full_name: full_name.to_string(),
            domain: domain.to_string(),
        };
        self.search(&target, options).await
    }

    /// Runs a search for any mode.
    ///
    /// Fails with [`SearchError::AllEnginesFailed`] when no selected engine
    /// succeeded; partial failures are reported inside the response.
    pub async fn search(&self, target: &SearchTarget, options: &SearchOptions) -> Result<SearchResponse> {
        let start = Instant::now();
        let query = target.build_query()?;

        let engines = if options.engines.is_empty() {
            &self.default_engines
        } else {
            &options.engines
        };
        let pages = options.pages.unwrap_or(1).max(1).min(self.max_search_pages.max(1));
        let search = self.select_search(options.use_proxy.unwrap_or(self.use_proxy));

        info!("{} search: {}", target.mode(), query);
        let outcomes = search.search(&query, engines, pages).await?;

        if outcomes.iter().all(EngineOutcome::is_failure) {
            warn!("All {} engines failed for {} search", outcomes.len(), target.mode());
            return Err(SearchError::AllEnginesFailed(outcomes.len()));
        }

        let mut response = self.aggregator.aggregate(&query, outcomes, options.ignore_duplicates);
        response.metadata.mode = target.mode().to_string();
        response.metadata.pages = pages;
        response.metadata.inputs = target.inputs();
        response.metadata.duration_ms = start.elapsed().as_millis() as u64;

        self.aggregator.save_debug_output(&response).await;
        Ok(response)
    }

    fn select_search(&self, use_proxy: bool) -> &Search {
        match (&self.proxied, use_proxy) {
            (Some(proxied), true) => proxied,
            (None, true) => {
                warn!("Proxy requested but none is configured, searching directly");
                &self.direct
            }
            _ => &self.direct,
        }
    }
}

fn engine_search(settings: &Settings, fetcher: Arc<dyn PageFetcher>, throttler: Arc<RequestThrottler>) -> Search {
    let mut search = Search::new();
    for kind in EngineKind::ALL {
        search.add_shared_engine(kind.create(Arc::clone(&fetcher)));
    }
    search.set_timeout(settings.search_timeout);
    search.set_max_concurrent(if settings.use_concurrent_search {
        settings.max_concurrent_searches
    } else {
        1
    });
    search.set_throttler(throttler);
    search
}
