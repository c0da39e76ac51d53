//! # search-gateway
//!
//! A REST gateway over scraped Google, Bing, Yahoo and DuckDuckGo results.
//!
//! A request names a search intent (a raw query, a company, a domain, or a
//! person at a domain). The gateway builds the engine query for that intent,
//! runs it against the selected engines, and returns the results as JSON:
//!
//! - Engine adapters behind one [`Engine`] trait, fetching pages through a
//!   [`PageFetcher`](fetcher::PageFetcher)
//! - Bounded concurrent execution with per-engine timeouts and throttling
//! - User-Agent rotation and an optional proxy pool
//! - An axum router with inbound rate limiting
//!
//! ## Example
//!
//! ```rust,no_run
//! use search_gateway::{SearchGateway, SearchOptions, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let gateway = SearchGateway::from_settings(&settings)?;
//!
//!     let options = SearchOptions::new().with_engines(["duckduckgo"]);
//!     let response = gateway.search_by_domain("rust-lang.org", &options).await?;
//!
//!     for result in response.items() {
//!         println!("{}: {}", result.title, result.url);
//!     }
//!     Ok(())
//! }
//! ```

mod aggregator;
mod engine;
mod error;
mod gateway;
mod query;
mod query_builder;
mod result;
mod search;

pub mod api;
pub mod config;
pub mod engines;
pub mod fetcher;
pub mod fetcher_http;
pub mod proxy;
pub mod rate_limit;
pub mod throttle;
pub mod user_agent;

pub use aggregator::Aggregator;
pub use config::Settings;
pub use engine::{Engine, EngineConfig};
pub use error::{Result, SearchError};
pub use gateway::{SearchGateway, SearchOptions};
pub use query::{SearchMode, SearchQuery};
pub use query_builder::{
    build_company_name_query, build_company_website_query, build_domain_query,
    build_email_pattern_query, build_full_query, build_simple_query, clean_domain,
    email_variations, validate_domain, SearchTarget,
};
pub use result::{EngineResults, SearchMetadata, SearchResponse, SearchResult};
pub use search::{EngineOutcome, Search};
