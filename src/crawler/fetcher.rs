//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the mirror, including:
//! - Building the HTTP client with the configured header profile
//! - Memoised GET requests keyed by cleaned location, in a bounded LRU cache
//! - Retry logic for transport failures
//! - The "unreachable" sentinel response
//! - Cache-busting and authorised requests for plugin endpoints

use crate::config::Config;
use crate::url::clean_url;
use crate::MirrorError;
use reqwest::header::{
    HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CACHE_CONTROL, EXPIRES, PRAGMA,
};
use lru::LruCache;
use reqwest::{Client, Response};
use std::borrow::Cow;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Status code of the response returned when a location cannot be reached
pub const UNREACHABLE_STATUS: u16 = 9999;

/// A completed GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects
    pub url: String,

    /// HTTP status code, or [`UNREACHABLE_STATUS`]
    pub status: u16,

    /// Raw body
    pub body: Vec<u8>,
}

impl FetchedPage {
    /// The sentinel response standing in for a transport failure
    pub fn unreachable(url: &str) -> Self {
        Self {
            url: url.to_string(),
            status: UNREACHABLE_STATUS,
            body: Vec::new(),
        }
    }

    /// Returns true if this is the sentinel response
    pub fn is_unreachable(&self) -> bool {
        self.status == UNREACHABLE_STATUS
    }

    /// Returns true for statuses below 400
    pub fn is_ok(&self) -> bool {
        self.status < 400
    }

    /// Body decoded as UTF-8, lossily
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The project configuration; its user-agent profile and the
///   configured `Accept` header are sent with every request
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &Config) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(accept) = HeaderValue::from_str(&config.settings.accept) {
        headers.insert(ACCEPT, accept);
    }

    Client::builder()
        .user_agent(config.user_agent_string())
        .default_headers(headers)
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// HTTP access for one run
///
/// Owns the client and the GET cache. Identical locations are fetched once
/// while they stay among the `cache_size` most recently used, or until
/// [`HttpFetcher::clear_cache`] is called; cloning shares the cache.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    retries: u32,
    strip_chars: String,
    cache: Arc<Mutex<LruCache<String, Arc<FetchedPage>>>>,
}

impl HttpFetcher {
    /// Creates a fetcher from the project configuration
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = build_http_client(config)?;
        Ok(Self::with_client(
            client,
            config.retries,
            &config.settings.clean.chars,
            config.settings.cache_size,
        ))
    }

    /// Creates a fetcher around an existing client
    ///
    /// A `cache_size` of zero keeps a single response.
    pub fn with_client(client: Client, retries: u32, strip_chars: &str, cache_size: usize) -> Self {
        let capacity = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            client,
            retries: retries.max(1),
            strip_chars: strip_chars.to_string(),
            cache: Arc::new(Mutex::new(LruCache::new(capacity))),
        }
    }

    /// Performs a memoised GET
    ///
    /// The location is cleaned before use and serves as the cache key.
    /// Transport failures are retried up to the configured count and then
    /// yield [`FetchedPage::unreachable`]; this never fails.
    pub async fn get(&self, url: &str) -> Arc<FetchedPage> {
        let key = clean_url(url, "", "", &self.strip_chars);

        if let Some(page) = self.cached(&key) {
            trace!("Cache hit: {}", key);
            return page;
        }

        let page = Arc::new(self.get_with_retries(&key).await);
        self.lock_cache().put(key, Arc::clone(&page));
        page
    }

    /// Empties the GET cache
    pub fn clear_cache(&self) {
        self.lock_cache().clear();
    }

    /// Number of memoised responses
    pub fn cache_len(&self) -> usize {
        self.lock_cache().len()
    }

    /// Sends an uncached GET with cache-busting headers
    ///
    /// Returns the live response so large bodies can be streamed to disk.
    pub async fn get_fresh(&self, url: &str) -> crate::Result<Response> {
        debug!("Fresh GET: {}", url);
        self.client
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store, must-revalidate")
            .header(PRAGMA, "no-cache")
            .header(EXPIRES, "0")
            .send()
            .await
            .map_err(|source| MirrorError::Http {
                url: url.to_string(),
                source,
            })
    }

    /// Sends an uncached GET with HTTP Basic authorisation
    ///
    /// # Arguments
    ///
    /// * `url` - The endpoint
    /// * `auth_token` - Base64 of `user:token`
    ///
    /// # Returns
    ///
    /// The status code and body text, whatever the status
    pub async fn get_authorized(&self, url: &str, auth_token: &str) -> crate::Result<(u16, String)> {
        debug!("Authorised GET: {}", url);
        let to_error = |source: reqwest::Error| MirrorError::Http {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, format!("Basic {}", auth_token))
            .send()
            .await
            .map_err(to_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(to_error)?;
        Ok((status, body))
    }

    async fn get_with_retries(&self, url: &str) -> FetchedPage {
        for attempt in 1..=self.retries {
            match self.try_get(url).await {
                Ok(page) => {
                    debug!("GET {} -> {}", url, page.status);
                    return page;
                }
                Err(e) => {
                    debug!("GET {} failed (attempt {}/{}): {}", url, attempt, self.retries, e);
                    if attempt < self.retries {
                        tokio::time::sleep(Duration::from_millis(100 * u64::from(attempt))).await;
                    }
                }
            }
        }

        warn!("Unreachable: {}", url);
        FetchedPage::unreachable(url)
    }

    async fn try_get(&self, url: &str) -> Result<FetchedPage, reqwest::Error> {
        let response = self.client.get(url).send().await?;
        let final_url = response.url().to_string();
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        Ok(FetchedPage {
            url: final_url,
            status,
            body,
        })
    }

    fn cached(&self, key: &str) -> Option<Arc<FetchedPage>> {
        self.lock_cache().get(key).cloned()
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, LruCache<String, Arc<FetchedPage>>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
