//! Search query representation.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::SearchError;

/// Search intent that decides how the engine query string is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Raw query, passed through.
    Simple,
    /// Company name lookup.
    Company,
    /// Pages on or mentioning a domain.
    Domain,
    /// A person's full name at a company domain.
    Full,
}

impl SearchMode {
    /// Returns the lowercase mode name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Company => "company",
            Self::Domain => "domain",
            Self::Full => "full",
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchMode {
    type Err = SearchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(Self::Simple),
            "company" => Ok(Self::Company),
            "domain" => Ok(Self::Domain),
            "full" => Ok(Self::Full),
            other => Err(SearchError::InvalidQuery(format!(
                "unknown search mode '{}'",
                other
            ))),
        }
    }
}

/// A query as handed to an engine: the built query string and a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    /// The search terms.
    pub query: String,
    /// Page number (1-indexed).
    pub page: u32,
}

impl SearchQuery {
    /// Creates a new search query for the first page.
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            page: 1,
        }
    }

    /// Sets the page number. Page 0 is treated as page 1.
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Zero-based result offset of the current page for a given page size.
    pub fn offset(&self, page_size: u32) -> u32 {
        (self.page.saturating_sub(1)).saturating_mul(page_size)
    }
}
