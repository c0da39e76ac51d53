//! Search engine implementations.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use scraper::{ElementRef, Selector};
use serde::{Deserialize, Serialize};

use crate::fetcher::PageFetcher;
use crate::{Engine, Result, SearchError};

mod bing;
mod duckduckgo;
mod google;
mod yahoo;

pub use bing::Bing;
pub use duckduckgo::DuckDuckGo;
pub use google::Google;
pub use yahoo::Yahoo;

/// The engines the gateway knows how to scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Google,
    Bing,
    Yahoo,
    #[serde(rename = "duckduckgo")]
    DuckDuckGo,
}

impl EngineKind {
    /// All engines, in default query order.
    pub const ALL: [EngineKind; 4] = [Self::Google, Self::Bing, Self::Yahoo, Self::DuckDuckGo];

    /// Canonical lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Bing => "bing",
            Self::Yahoo => "yahoo",
            Self::DuckDuckGo => "duckduckgo",
        }
    }

    /// Short alias accepted in requests.
    pub fn shortcut(&self) -> &'static str {
        match self {
            Self::Google => "g",
            Self::Bing => "b",
            Self::Yahoo => "y",
            Self::DuckDuckGo => "ddg",
        }
    }

    /// One-line description for listings.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Google => "Google Search",
            Self::Bing => "Microsoft Bing",
            Self::Yahoo => "Yahoo Search",
            Self::DuckDuckGo => "DuckDuckGo (HTML endpoint)",
        }
    }

    /// Creates the engine, fetching pages through `fetcher`.
    pub fn create(&self, fetcher: Arc<dyn PageFetcher>) -> Arc<dyn Engine> {
        match self {
            Self::Google => Arc::new(Google::new(fetcher)),
            Self::Bing => Arc::new(Bing::new(fetcher)),
            Self::Yahoo => Arc::new(Yahoo::new(fetcher)),
            Self::DuckDuckGo => Arc::new(DuckDuckGo::new(fetcher)),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EngineKind {
    type Err = SearchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted || kind.shortcut() == wanted)
            .ok_or_else(|| SearchError::UnknownEngine(s.trim().to_string()))
    }
}

/// Parses a CSS selector, mapping failures to a parse error.
pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| SearchError::Parse(format!("Failed to parse selector '{}': {:?}", css, e)))
}

/// Concatenated, whitespace-collapsed text of an element.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::testing::StaticFetcher;

    #[test]
    fn test_engine_kind_from_name_and_shortcut() {
        assert_eq!("google".parse::<EngineKind>().unwrap(), EngineKind::Google);
        assert_eq!("G".parse::<EngineKind>().unwrap(), EngineKind::Google);
        assert_eq!("Bing".parse::<EngineKind>().unwrap(), EngineKind::Bing);
        assert_eq!("y".parse::<EngineKind>().unwrap(), EngineKind::Yahoo);
        assert_eq!(" ddg ".parse::<EngineKind>().unwrap(), EngineKind::DuckDuckGo);
        assert_eq!("duckduckgo".parse::<EngineKind>().unwrap(), EngineKind::DuckDuckGo);
    }

    #[test]
    fn test_engine_kind_unknown() {
        let err = "altavista".parse::<EngineKind>().unwrap_err();
        assert!(matches!(err, SearchError::UnknownEngine(ref name) if name == "altavista"));
    }

    #[test]
    fn test_engine_kind_serialization() {
        assert_eq!(serde_json::to_string(&EngineKind::DuckDuckGo).unwrap(), "\"duckduckgo\"");
        let kind: EngineKind = serde_json::from_str("\"yahoo\"").unwrap();
        assert_eq!(kind, EngineKind::Yahoo);
    }

    #[test]
    fn test_engine_kind_create_uses_canonical_names() {
        let fetcher: Arc<dyn PageFetcher> = Arc::new(StaticFetcher::new(""));
        for kind in EngineKind::ALL {
            let engine = kind.create(Arc::clone(&fetcher));
            assert_eq!(engine.name(), kind.name());
            assert_eq!(engine.shortcut(), kind.shortcut());
            assert!(engine.is_enabled());
        }
    }

    #[test]
    fn test_element_text_collapses_whitespace() {
        let html = scraper::Html::parse_fragment("<p>  Rust \n  <b>is</b>\tfast </p>");
        let p = selector("p").unwrap();
        let element = html.select(&p).next().unwrap();
        assert_eq!(element_text(element), "Rust is fast");
    }

    #[test]
    fn test_selector_rejects_invalid_css() {
        assert!(matches!(selector("div[["), Err(SearchError::Parse(_))));
    }
}
