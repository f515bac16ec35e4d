use crate::domain::{ProxyConfig, Result};
use async_trait::async_trait;
use url::Url;

/// Port for retrieving proxy auto-configuration scripts
#[async_trait]
pub trait PacFetcherPort: Send + Sync {
    /// Fetch the script behind `script_url`
    ///
    /// Returns Ok(None) when the URL scheme is not one this fetcher retrieves.
    async fn fetch(&self, script_url: &Url) -> Result<Option<String>>;
}

/// Port for running a PAC script's `FindProxyForURL` against a target
pub trait PacExecutorPort: Send + Sync {
    /// Evaluate `script` for `target`, returning its proxies in priority order
    fn execute(&self, script: &str, target: &Url) -> Result<Vec<ProxyConfig>>;
}
