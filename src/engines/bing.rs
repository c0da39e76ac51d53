//! Bing search engine implementation.
//!
//! Bing wraps many result links in `/ck/a?...&u=a1<base64url>` click
//! trackers; those are decoded back to the target URL.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use scraper::Html;
use tracing::debug;

use super::{element_text, selector};
use crate::fetcher::PageFetcher;
use crate::{Engine, EngineConfig, Result, SearchQuery, SearchResult};

/// Bing search engine.
pub struct Bing {
    config: EngineConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl Bing {
    /// Creates a new Bing engine with the given page fetcher.
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            config: EngineConfig::new("bing", "b")
                .paged(10)
                .with_block_markers(["b_captcha", "/challenge/verify"]),
            fetcher,
        }
    }

    /// Creates with custom configuration.
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    fn search_url(&self, query: &SearchQuery) -> String {
        // `first` is 1-based.
        format!(
            "https://www.bing.com/search?q={}&setlang=en&count={}&first={}",
            urlencoding::encode(&query.query),
            self.config.page_size,
            self.config.offset(query) + 1
        )
    }

    fn parse_results(&self, html: &str) -> Result<Vec<SearchResult>> {
        let document = Html::parse_document(html);

        let result_selector = selector("li.b_algo")?;
        let title_selector = selector("h2")?;
        let link_selector = selector("a[href]")?;
        let snippet_selector = selector(".b_caption p, .b_lineclamp2, .b_lineclamp3")?;

        let mut results = Vec::new();

        for element in document.select(&result_selector) {
            let Some(title_el) = element.select(&title_selector).next() else {
                continue;
            };
            let title = element_text(title_el);
            if title.is_empty() {
                continue;
            }

            let url = title_el
                .select(&link_selector)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(resolve_link);
            let url = match url {
                Some(u) if u.starts_with("http") => u,
                _ => continue,
            };

            let snippet = element
                .select(&snippet_selector)
                .next()
                .map(element_text)
                .unwrap_or_default();

            results.push(SearchResult::new(url, title, snippet));
        }

        debug!("Bing parsed {} results", results.len());
        Ok(results)
    }
}

/// Unwraps Bing click-tracking links, returning other hrefs unchanged.
fn resolve_link(href: &str) -> String {
    if !href.contains("bing.com/ck/a") {
        return href.to_string();
    }

    let encoded = url::Url::parse(href).ok().and_then(|u| {
        u.query_pairs()
            .find(|(key, _)| key == "u")
            .map(|(_, value)| value.into_owned())
    });

    encoded
        .as_deref()
        .and_then(|value| value.strip_prefix("a1"))
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok())
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| href.to_string())
}

#[async_trait]
impl Engine for Bing {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let html = self.fetcher.fetch(&self.search_url(query)).await?;

        self.ensure_not_blocked(&html)?;

        self.parse_results(&html)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;
    use crate::SearchError;

    const MOCK_BING_HTML: &str = r#"<!DOCTYPE html>
<html>
<body>
<ol id="b_results">
<li class="b_algo">
  <h2><a href="https://www.rust-lang.org/" h="ID=SERP">Rust Programming Language</a></h2>
  <div class="b_caption"><p>A language empowering everyone to build reliable and efficient software.</p></div>
</li>
<li class="b_algo">
  <h2><a href="https://www.bing.com/ck/a?!&amp;&amp;p=abc&amp;u=a1aHR0cHM6Ly9kb2MucnVzdC1sYW5nLm9yZy9ib29rLw&amp;ntb=1">The Rust Book</a></h2>
  <p class="b_lineclamp2">An introductory book about Rust.</p>
</li>
<li class="b_algo">
  <h2>No link here</h2>
</li>
</ol>
</body>
</html>"#;

    fn make_bing() -> Bing {
        Bing::new(Arc::new(StaticFetcher::new("")))
    }

    #[test]
    fn test_bing_new() {
        let engine = make_bing();
        assert_eq!(engine.config.name, "bing");
        assert_eq!(engine.config.shortcut, "b");
        assert!(engine.config.paging);
    }

    #[test]
    fn test_bing_with_config() {
        let engine = make_bing().with_config(EngineConfig {
            name: "bing-test".to_string(),
            enabled: false,
            ..Default::default()
        });
        assert_eq!(engine.name(), "bing-test");
        assert!(!engine.is_enabled());
    }

    #[test]
    fn test_search_url_paging() {
        let engine = make_bing();
        assert!(engine
            .search_url(&SearchQuery::new("rust"))
            .ends_with("&first=1"));
        assert!(engine
            .search_url(&SearchQuery::new("rust").with_page(2))
            .ends_with("&first=11"));
    }

    #[test]
    fn test_parse_results() {
        let results = make_bing().parse_results(MOCK_BING_HTML).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Rust Programming Language");
        assert_eq!(results[0].url, "https://www.rust-lang.org/");
        assert!(results[0].snippet.contains("reliable and efficient software"));
        assert_eq!(results[1].url, "https://doc.rust-lang.org/book/");
        assert_eq!(results[1].snippet, "An introductory book about Rust.");
    }

    #[test]
    fn test_parse_empty_html() {
        assert!(make_bing()
            .parse_results("<html><body></body></html>")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_resolve_link_plain() {
        assert_eq!(resolve_link("https://example.com/a"), "https://example.com/a");
    }

    #[test]
    fn test_resolve_link_undecodable_keeps_original() {
        let href = "https://www.bing.com/ck/a?u=zzz";
        assert_eq!(resolve_link(href), href);
    }

    #[tokio::test]
    async fn test_search_detects_captcha() {
        let html = r#"<div class="b_captcha">Verify you are human</div>"#;
        let engine = Bing::new(Arc::new(StaticFetcher::new(html)));
        let result = engine.search(&SearchQuery::new("rust")).await;
        assert!(matches!(result, Err(SearchError::Blocked(ref name)) if name == "bing"));
    }

    #[tokio::test]
    async fn test_search_uses_fetcher() {
        let fetcher = Arc::new(StaticFetcher::new(MOCK_BING_HTML));
        let engine = Bing::new(fetcher.clone());
        let results = engine.search(&SearchQuery::new("rust book")).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(fetcher.last_url().unwrap().contains("q=rust%20book"));
    }
}
