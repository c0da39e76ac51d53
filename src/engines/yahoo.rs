//! Yahoo search engine implementation.
//!
//! Yahoo routes result links through `r.search.yahoo.com` with the target
//! URL percent-encoded between `/RU=` and `/RK=`.

use std::sync::Arc;

use async_trait::async_trait;
use scraper::Html;

use super::{element_text, selector};
use crate::fetcher::PageFetcher;
use crate::{Engine, EngineConfig, Result, SearchQuery, SearchResult};

/// Yahoo search engine.
pub struct Yahoo {
    config: EngineConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl Yahoo {
    /// Creates a new Yahoo engine with the given page fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config: EngineConfig::new("yahoo", "y")
                .paged(10)
                .with_block_markers(["consent.yahoo.com", "guce.yahoo.com"]),
            fetcher,
        }
    }

    /// Creates with custom configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        format!(
            "https://search.yahoo.com/search?p={}&n={}&b={}",
            urlencoding::encode(&query.query),
            self.config.page_size,
            self.config.offset(query) + 1
        )
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let result_selector = selector("div.algo")?;
        let link_selector = selector("h3 a[href], .compTitle a[href]")?;
        let snippet_selector = selector(".compText p, div.compText")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let Some(link) = element.select(&link_selector).next() else {
                continue;
            };

            // The anchor text often carries the display URL in front of the
            // title; aria-label holds the bare title when present.
            let title = link
                .value()
                .attr("aria-label")
                .map(|label| label.trim().to_string())
                .filter(|label| !label.is_empty())
                .unwrap_or_else(|| element_text(link));
            if title.is_empty() {
                continue;
            }

            let href = link.value().attr("href").unwrap_or_default();
            let url = resolve_link(href);
            if !url.starts_with("http") {
                continue;
            }

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            results.push(SearchResult::new(url, title, snippet));
        }

        Ok(results)
    }
}

/// Unwraps `.../RU=<encoded>/RK=...` redirect links.
fn resolve_link(href: &str) -> String {
    let Some(start) = href.find("/RU=") else {
        return href.to_string();
    };
    let rest = &href[start + 4..];
    let end = rest.find("/RK=").or_else(|| rest.find("/RS=")).unwrap_or(rest.len());
    urlencoding::decode(&rest[..end])
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| href.to_string())
}

#[async_trait]
impl Engine for Yahoo {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let html = self.fetcher.fetch(&self.search_url(query)).await?;

        self.ensure_not_blocked(&html)?;

        self.parse_results(&html)
    }
}
