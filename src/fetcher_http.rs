//! HTTP-based page fetcher using reqwest.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, USER_AGENT};
use reqwest::{Client, StatusCode};
use tracing::debug;

use crate::fetcher::PageFetcher;
use crate::proxy::ProxyPool;
use crate::user_agent::UserAgentPolicy;
use crate::{Result, SearchError};

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE_EN: &str = "en-US,en;q=0.9";

/// A page fetcher that uses plain HTTP requests via reqwest.
///
/// Every request gets a User-Agent from the configured policy. When a
/// proxy pool is attached and enabled, each request goes through the
/// pool's next proxy and the outcome is reported back to the pool.
pub struct HttpFetcher {
    client: Client,
    user_agent: UserAgentPolicy,
    proxy_pool: Option<Arc<ProxyPool>>,
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a new `HttpFetcher` with a rotating User-Agent and the given timeout.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SearchError::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client).with_timeout(timeout))
    }

    /// Creates an `HttpFetcher` with a custom reqwest client.
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            user_agent: UserAgentPolicy::default(),
            proxy_pool: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Sets the User-Agent policy.
    pub fn with_user_agent(mut self, policy: UserAgentPolicy) -> Self {
        self.user_agent = policy;
        self
    }

    /// Routes requests through a proxy pool.
    pub fn with_proxy_pool(mut self, pool: Arc<ProxyPool>) -> Self {
        self.proxy_pool = Some(pool);
        self
    }

    /// Sets the timeout used for proxied clients.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the attached proxy pool, if any.
    pub fn proxy_pool(&self) -> Option<&Arc<ProxyPool>> {
        self.proxy_pool.as_ref()
    }

    async fn get(&self, client: &Client, url: &str) -> Result<String> {
        let response = client
            .get(url)
            .header(USER_AGENT, self.user_agent.next())
            .header(ACCEPT, ACCEPT_HTML)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGE_EN)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let host = host_of(url);
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(SearchError::Blocked(host));
            }
            return Err(SearchError::Status {
                engine: host,
                status: status.as_u16(),
            });
        }

        let html = response.text().await?;
        debug!("Fetched {} bytes from {}", html.len(), host_of(url));
        Ok(html)
    }
}

fn host_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let pool = match &self.proxy_pool {
            Some(pool) if pool.is_enabled() => pool,
            _ => return self.get(&self.client, url).await,
        };

        let Some(proxy) = pool.get_proxy().await else {
            return self.get(&self.client, url).await;
        };

        let client = ProxyPool::create_client(&proxy, self.timeout)?;
        let outcome = self.get(&client, url).await;
        match &outcome {
            Ok(_) => pool.mark_success(&proxy).await,
            Err(_) => pool.mark_error(&proxy).await,
        }
        outcome
    }
}
