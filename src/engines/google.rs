//! Google search engine implementation.
//!
//! Scrapes the classic HTML results page. Google aggressively serves
//! CAPTCHA pages to automated clients; those are detected and reported as
//! [`SearchError::Blocked`](crate::SearchError::Blocked) instead of being parsed as an empty page.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{element_text, selector};
use crate::fetcher::PageFetcher;
use crate::{Engine, EngineConfig, Result, SearchQuery, SearchResult};

/// Google search engine.
pub struct Google {
    config: EngineConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl Google {
    /// Creates a new Google engine with the given page fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config: EngineConfig::new("google", "g")
                .paged(10)
                .with_block_markers(["/sorry/index", "recaptcha", "unusual traffic"]),
            fetcher,
        }
    }

    /// Creates with custom configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        let mut url = format!(
            "https://www.google.com/search?q={}&hl=en&num={}",
            urlencoding::encode(&query.query),
            self.config.page_size
        );
        if query.page > 1 {
            url.push_str(&format!("&start={}", self.config.offset(query)));
        }
        url
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let container_selector = selector("div.g")?;
        let title_selector = selector("h3")?;
        let link_selector = selector("a[href]")?;
        let snippet_selector = selector("div[data-sncf], div.VwiC3b")?;

        let mut results = Vec::new();

        for element in document.select(&container_selector) {
            let title = match element.select(&title_selector).next() {
                Some(el) => element_text(el),
                None => continue,
            };

            let href = match element.select(&link_selector).next() {
                Some(el) => el.value().attr("href").unwrap_or_default(),
                None => continue,
            };
            let Some(url) = resolve_link(href) else {
                continue;
            };

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            if !title.is_empty() {
                results.push(SearchResult::new(url, title, snippet));
            }
        }

        Ok(results)
    }
}

/// Turns a result href into the target URL, unwrapping `/url?q=` redirects.
/// Internal Google links yield `None`.
fn resolve_link(href: &str) -> Option<String> {
    if href.starts_with("/url?") {
        let url = url::Url::parse(&format!("https://www.google.com{}", href)).ok()?;
        return url
            .query_pairs()
            .find(|(key, _)| key == "q" || key == "url")
            .map(|(_, value)| value.into_owned())
            .filter(|target| target.starts_with("http"));
    }
    if href.starts_with("http") {
        return Some(href.to_string());
    }
    None
}

#[async_trait]
impl Engine for Google {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let html = self.fetcher.fetch(&self.search_url(query)).await?;

        self.ensure_not_blocked(&html)?;

        self.parse_results(&html)
    }
}
