//! DuckDuckGo search engine implementation.
//!
//! Uses the JavaScript-free HTML endpoint, which pages in steps of 30.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{element_text, selector};
use crate::fetcher::PageFetcher;
use crate::{Engine, EngineConfig, Result, SearchQuery, SearchResult};

/// DuckDuckGo search engine.
pub struct DuckDuckGo {
    config: EngineConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl DuckDuckGo {
    /// Creates a new DuckDuckGo engine with the given page fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config: EngineConfig::new("duckduckgo", "ddg")
                .paged(30)
                .with_block_markers(["anomaly-modal", "challenge-form"]),
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
            "https://html.duckduckgo.com/html/?q={}",
            urlencoding::encode(&query.query)
        );
        if query.page > 1 {
            let offset = self.config.offset(query);
            url.push_str(&format!("&s={}&dc={}", offset, offset + 1));
        }
        url
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);
        let result_selector = selector(".result")?;
        let title_selector = selector(".result__title a, a.result__a")?;
        let snippet_selector = selector(".result__snippet")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let is_ad = element
                .value()
                .classes()
                .any(|class| class == "result--ad");
            if is_ad {
                continue;
            }

            let Some(title_elem) = element.select(&title_selector).next() else {
                continue;
            };

            let title = element_text(title_elem);
            let href = title_elem.value().attr("href").unwrap_or_default();
            let url = extract_redirect_url(href).unwrap_or_else(|| href.to_string());

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            if url.starts_with("http") && !title.is_empty() {
                results.push(SearchResult::new(url, title, snippet));
            }
        }

        Ok(results)
    }
}

/// Extracts the `uddg` target from a `//duckduckgo.com/l/?uddg=...` link.
fn extract_redirect_url(href: &str) -> Option<String> {
    if !href.contains("duckduckgo.com/l/") {
        return None;
    }
    let absolute = if href.starts_with("//") {
        format!("https:{}", href)
    } else {
        href.to_string()
    };
    let parsed = url::Url::parse(&absolute).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "uddg")
        .map(|(_, value)| value.into_owned())
}

#[async_trait]
impl Engine for DuckDuckGo {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let html = self.fetcher.fetch(&self.search_url(query)).await?;

        self.ensure_not_blocked(&html)?;

        self.parse_results(&html)
    }
}
