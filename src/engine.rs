//! Search engine trait and configuration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{Result, SearchError, SearchQuery, SearchResult};

/// Static description of a scraped engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Canonical lowercase name, used as the key in requests and responses.
    pub name: String,
    /// Short alias accepted in engine lists (e.g. "ddg").
    pub shortcut: String,
    /// Results the engine serves per page; drives the paging offset.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Substrings that only appear on the engine's CAPTCHA or consent pages.
    #[serde(default)]
    pub block_markers: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Whether pages beyond the first can be requested.
    #[serde(default)]
    pub paging: bool,
}

fn default_page_size() -> u32 {
    10
}

fn default_enabled() -> bool {
    true
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            shortcut: String::new(),
            page_size: default_page_size(),
            block_markers: Vec::new(),
            enabled: true,
            paging: false,
        }
    }
}

impl EngineConfig {
    pub fn new(name: impl Into<String>, shortcut: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            shortcut: shortcut.into(),
            ..Default::default()
        }
    }

    /// Enables paging with `page_size` results per page.
    pub fn paged(mut self, page_size: u32) -> Self {
        self.paging = true;
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_block_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.block_markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Zero-based index of the first result on `query`'s page.
    pub fn offset(&self, query: &SearchQuery) -> u32 {
        query.offset(self.page_size)
    }

    /// Returns whether `html` is a bot-detection page rather than results.
    pub fn is_blocked_page(&self, html: &str) -> bool {
        self.block_markers.iter().any(|marker| html.contains(marker.as_str()))
    }
}

/// A scraped search engine.
///
/// An engine receives the final query string (already built for the
/// search mode) and a page number, and returns the results in the order
/// the engine presented them.
#[async_trait]
pub trait Engine: Send + Sync {
    fn config(&self) -> &EngineConfig;

    /// Fetches and parses one result page.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>>;

    fn name(&self) -> &str {
        &self.config().name
    }

    fn shortcut(&self) -> &str {
        &self.config().shortcut
    }

    fn is_enabled(&self) -> bool {
        self.config().enabled
    }

    fn supports_paging(&self) -> bool {
        self.config().paging
    }

    /// Fails with [`SearchError::Blocked`] when `html` is a CAPTCHA page.
    fn ensure_not_blocked(&self, html: &str) -> Result<()> {
        if self.config().is_blocked_page(html) {
            return Err(SearchError::Blocked(self.name().to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Stub(EngineConfig);

    #[async_trait]
    impl Engine for Stub {
        fn config(&self) -> &EngineConfig {
            &self.0
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<SearchResult>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.page_size, 10);
        assert!(config.block_markers.is_empty());
        assert!(config.enabled);
        assert!(!config.paging);
    }

    #[test]
    fn test_paged_offsets() {
        let config = EngineConfig::new("duckduckgo", "ddg").paged(30);
        assert!(config.paging);
        assert_eq!(config.offset(&SearchQuery::new("q")), 0);
        assert_eq!(config.offset(&SearchQuery::new("q").with_page(3)), 60);

        let config = EngineConfig::new("odd", "o").paged(0);
        assert_eq!(config.page_size, 1);
    }

    #[test]
    fn test_block_detection() {
        let engine = Stub(EngineConfig::new("google", "g").with_block_markers(["/sorry/index", "recaptcha"]));
        assert!(engine.ensure_not_blocked("<div class=\"g\">ok</div>").is_ok());

        let err = engine
            .ensure_not_blocked("<form action=\"/sorry/index\">")
            .unwrap_err();
        assert!(matches!(err, SearchError::Blocked(ref name) if name == "google"));
    }

    #[test]
    fn test_engine_config_deserialization_defaults() {
        let config: EngineConfig = serde_json::from_str(r#"{"name":"bing","shortcut":"b"}"#).unwrap();
        assert_eq!(config, EngineConfig::new("bing", "b"));
        assert!(!Stub(config).supports_paging());
    }
}
