use crate::domain::{ProxyError, Result};
use crate::ports::PacFetcherPort;
use async_trait::async_trait;
use log::debug;
use lru::LruCache;
use reqwest::ClientBuilder;
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::info;
use url::Url;

pub const DEFAULT_PAC_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_PAC_CACHE_SIZE: usize = 5;

pub fn default_supported_schemes() -> Vec<String> {
    vec!["http".to_string(), "https".to_string()]
}

/// PAC fetcher reading `file:` URLs from disk and downloading the allowed network
/// schemes without going through any proxy.
pub struct UrlPacFetcher {
    supported_schemes: Vec<String>,
    timeout: Duration,
    pac_cache: Option<RwLock<LruCache<String, String>>>,
}

impl UrlPacFetcher {
    pub fn new() -> Self {
        Self {
            supported_schemes: default_supported_schemes(),
            timeout: DEFAULT_PAC_TIMEOUT,
            pac_cache: NonZeroUsize::new(DEFAULT_PAC_CACHE_SIZE).map(|size| RwLock::new(LruCache::new(size))),
        }
    }

    pub fn with_supported_schemes(mut self, schemes: Vec<String>) -> Self {
        self.supported_schemes = schemes.into_iter().map(|s| s.to_ascii_lowercase()).collect();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Size of the downloaded-script cache; 0 disables it.
    pub fn with_cache_size(mut self, size: usize) -> Self {
        self.pac_cache = NonZeroUsize::new(size).map(|size| RwLock::new(LruCache::new(size)));
        self
    }

    pub async fn clear_cache(&self) {
        if let Some(cache) = &self.pac_cache {
            cache.write().await.clear();
        }
    }

    async fn read_file(&self, pac_url: &Url) -> Result<String> {
        let path = pac_url
            .to_file_path()
            .map_err(|_| ProxyError::InvalidUri(format!("Not a local path: {}", pac_url)))?;

        debug!("Reading PAC file at {}", path.display());
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ProxyError::FetchFailed(format!("Cannot read {}: {}", path.display(), e)))
    }

    async fn load_pac(&self, pac_url: &Url) -> Result<String> {
        debug!("Attempting to download PAC file at {}", pac_url);

        let pac_file = ClientBuilder::new()
            .no_proxy()
            .timeout(self.timeout)
            .build()
            .map_err(|e| ProxyError::FetchFailed(format!("HTTP client error: {}", e)))?
            .get(pac_url.as_str())
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| ProxyError::FetchFailed(format!("PAC download error: {}", e)))?
            .text()
            .await
            .map_err(|e| ProxyError::FetchFailed(format!("PAC read error: {}", e)))?;

        if let Some(cache) = &self.pac_cache {
            cache.write().await.put(pac_url.to_string(), pac_file.clone());
        }

        info!("Loaded PAC file from {} ({} bytes)", pac_url, pac_file.len());
        Ok(pac_file)
    }

    async fn get_pac_file(&self, pac_url: &Url) -> Result<String> {
        if let Some(cache) = &self.pac_cache {
            let mut cache = cache.write().await;
            if let Some(cached) = cache.get(pac_url.as_str()) {
                return Ok(cached.clone());
            }
        }

        self.load_pac(pac_url).await
    }
}

impl Default for UrlPacFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PacFetcherPort for UrlPacFetcher {
    async fn fetch(&self, script_url: &Url) -> Result<Option<String>> {
        let scheme = script_url.scheme().to_ascii_lowercase();

        if scheme == "file" {
            return self.read_file(script_url).await.map(Some);
        }

        if !self.supported_schemes.iter().any(|s| *s == scheme) {
            debug!("Not fetching PAC file over unsupported scheme {}", scheme);
            return Ok(None);
        }

        self.get_pac_file(script_url).await.map(Some)
    }
}
