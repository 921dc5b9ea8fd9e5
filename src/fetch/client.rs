//! HTTP client for retailer pages using wreq for TLS fingerprint emulation.
//!
//! Requests carry a randomized user-agent from a fixed pool plus static
//! browser headers. Domains on the proxy deny-list are routed through a
//! ScraperAPI-style fetch proxy with a longer timeout.

use crate::config::Config;
use crate::error::FetchError;
use crate::extract::retailers::host_of;
use anyhow::{Context, Result};
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use std::time::Duration;
use tracing::{debug, warn};
use wreq::Client;
use wreq_util::Emulation;

/// Trait for page fetching - enables mocking for tests.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetches a product page and returns the raw markup.
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Realistic browser user-agent pool; one is drawn per request so the
/// traffic does not present a single uniform fingerprint.
pub const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36 Edg/120.0.0.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const DEFAULT_PROXY_BASE: &str = "http://api.scraperapi.com";

/// HTTP client with browser impersonation and proxy indirection.
pub struct FetchClient {
    direct: Client,
    proxied: Client,
    proxy_api_key: Option<String>,
    proxy_domains: Vec<String>,
    direct_timeout: Duration,
    proxy_timeout: Duration,
    proxy_base_url: String,
}

impl FetchClient {
    /// Creates a new fetch client from the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_proxy_base_url(config, None)
    }

    /// Creates a fetch client with a custom proxy endpoint (for testing).
    pub fn with_proxy_base_url(config: &Config, proxy_base_url: Option<String>) -> Result<Self> {
        let direct_timeout = Duration::from_secs(config.fetch_timeout_secs);
        let proxy_timeout = Duration::from_secs(config.proxy_timeout_secs);

        let direct = Client::builder()
            .cookie_store(true)
            .gzip(true)
            .brotli(true)
            .timeout(direct_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build direct HTTP client")?;

        let proxied = Client::builder()
            .gzip(true)
            .timeout(proxy_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build proxied HTTP client")?;

        Ok(Self {
            direct,
            proxied,
            proxy_api_key: config.proxy_api_key.clone(),
            proxy_domains: config.proxy_domains.clone(),
            direct_timeout,
            proxy_timeout,
            proxy_base_url: proxy_base_url.unwrap_or_else(|| DEFAULT_PROXY_BASE.to_string()),
        })
    }

    /// Whether the URL's domain is on the deny-list of sites that block
    /// non-browser traffic.
    fn needs_proxy(&self, url: &str) -> bool {
        match host_of(url) {
            Some(host) => self.proxy_domains.iter().any(|d| host.contains(d.as_str())),
            None => false,
        }
    }

    async fn get_direct(&self, url: &str) -> Result<String, FetchError> {
        let user_agent = USER_AGENTS.choose(&mut rand::rng()).unwrap_or(&USER_AGENTS[0]);

        debug!("GET {} (direct)", url);

        let response = self
            .direct
            .get(url)
            .emulation(Emulation::Chrome131)
            .header("User-Agent", *user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8")
            .header("Accept-Language", "ro-RO,ro;q=0.9,en-US;q=0.8,en;q=0.7")
            .header("Accept-Encoding", "gzip, deflate, br")
            .header("Connection", "keep-alive")
            .header("Upgrade-Insecure-Requests", "1")
            .header("Cache-Control", "max-age=0")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, self.direct_timeout))?;

        self.read_body(response).await
    }

    async fn get_proxied(&self, url: &str) -> Result<String, FetchError> {
        let Some(api_key) = self.proxy_api_key.as_deref() else {
            let host = host_of(url).unwrap_or_else(|| url.to_string());
            return Err(FetchError::ProxyCredentialMissing(host));
        };

        let proxy_url = format!(
            "{}?api_key={}&url={}&country_code=ro",
            self.proxy_base_url,
            api_key,
            urlencoding::encode(url)
        );

        debug!("GET {} (via fetch proxy)", url);

        let response = self
            .proxied
            .get(&proxy_url)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| self.map_transport_error(e, self.proxy_timeout))?;

        self.read_body(response).await
    }

    async fn read_body(&self, response: wreq::Response) -> Result<String, FetchError> {
        let status = response.status();
        debug!("Response status: {}", status);

        if !status.is_success() {
            if status.as_u16() == 503 {
                warn!("Rate limited (503); the retailer may be blocking this client");
            }
            return Err(FetchError::Status(status.as_u16()));
        }

        response.text().await.map_err(|e| FetchError::Transport(e.to_string()))
    }

    fn map_transport_error(&self, err: wreq::Error, timeout: Duration) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Transport(err.to_string())
        }
    }
}

#[async_trait]
impl PageFetcher for FetchClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        if self.needs_proxy(url) {
            self.get_proxied(url).await
        } else {
            self.get_direct(url).await
        }
    }
}
