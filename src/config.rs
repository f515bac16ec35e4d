use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::adapters::{
    default_supported_schemes, CredentialProvider, JsPacExecutor, ProxySettings, SettingsCandidateSource,
    UrlPacFetcher, DEFAULT_PAC_CACHE_SIZE, DEFAULT_PAC_TIMEOUT,
};
use crate::domain::normalizer::default_scheme_rules;
use crate::domain::service::DEFAULT_MAX_INDIRECTION_DEPTH;
use crate::domain::{AuthRule, PacResultMode, ProxyError, ProxyResolver, ResolverOptions, Result};
use crate::ports::CandidateSourcePort;

pub const APP_NAME: &str = "proxyresolver";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub settings: ProxySettings,
    /// Fill unset proxy settings from HTTP_PROXY, HTTPS_PROXY, ALL_PROXY and NO_PROXY.
    pub use_env: bool,
    pub scheme_rules: HashMap<String, String>,
    pub supported_pac_schemes: Vec<String>,
    pub max_indirection_depth: usize,
    pub pac_results: PacResultMode,
    pub pac_timeout_secs: u64,
    pub pac_cache_size: usize,
    pub auth_rules: Vec<AuthRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: ProxySettings::default(),
            use_env: true,
            scheme_rules: default_scheme_rules(),
            supported_pac_schemes: default_supported_schemes(),
            max_indirection_depth: DEFAULT_MAX_INDIRECTION_DEPTH,
            pac_results: PacResultMode::default(),
            pac_timeout_secs: DEFAULT_PAC_TIMEOUT.as_secs(),
            pac_cache_size: DEFAULT_PAC_CACHE_SIZE,
            auth_rules: Vec::new(),
        }
    }
}

impl Config {
    /// Load the configuration from `path`, or from the platform configuration
    /// directory. A missing file is created with the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let loaded = match path {
            Some(path) => confy::load_path(path),
            None => confy::load(APP_NAME, None),
        };
        loaded.map_err(|e| ProxyError::Config(e.to_string()))
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            scheme_rules: self.scheme_rules.clone(),
            max_indirection_depth: self.max_indirection_depth,
            pac_results: self.pac_results,
        }
    }

    pub fn proxy_settings(&self) -> ProxySettings {
        if self.use_env {
            self.settings.clone().or(ProxySettings::from_env())
        } else {
            self.settings.clone()
        }
    }

    pub fn candidate_source(&self) -> Arc<dyn CandidateSourcePort> {
        Arc::new(SettingsCandidateSource::new(self.proxy_settings()))
    }

    pub fn pac_fetcher(&self) -> UrlPacFetcher {
        UrlPacFetcher::new()
            .with_supported_schemes(self.supported_pac_schemes.clone())
            .with_timeout(Duration::from_secs(self.pac_timeout_secs))
            .with_cache_size(self.pac_cache_size)
    }

    /// Wire the resolver with the configured adapters around `candidates`.
    pub fn build_resolver(&self, candidates: Arc<dyn CandidateSourcePort>) -> Result<ProxyResolver> {
        let credentials = CredentialProvider::new(self.auth_rules.clone())?;

        Ok(ProxyResolver::new(
            candidates,
            Arc::new(self.pac_fetcher()),
            Arc::new(JsPacExecutor::new()),
            Arc::new(credentials),
        )
        .with_options(self.resolver_options()))
    }
}
