use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use url::Url;

use super::ResolutionError;
use crate::ports::CredentialsPort;

pub const TYPE_NONE: &str = "none";
pub const TYPE_AUTO_CONFIG_URL: &str = "pac-url";
pub const TYPE_AUTO_CONFIG_SCRIPT: &str = "pac-script";
pub const TYPE_HTTP: &str = "http";
pub const TYPE_HTTPS: &str = "https";
pub const TYPE_SOCKS: &str = "socks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyKind {
    Http,
    Https,
    Socks,
}

impl ProxyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyKind::Http => TYPE_HTTP,
            ProxyKind::Https => TYPE_HTTPS,
            ProxyKind::Socks => TYPE_SOCKS,
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ProxyKind::Http => 80,
            ProxyKind::Https => 443,
            ProxyKind::Socks => 1080,
        }
    }
}

impl fmt::Display for ProxyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str().to_uppercase())
    }
}

/// A proxy configuration record as reported by a candidate source or a PAC script.
///
/// Nothing about the record is trusted: the resolver validates it into a
/// [`ProxyConfigEntry`] right before evaluating it, so a malformed record only costs
/// the candidate it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(rename = "type")]
    pub proxy_type: Option<String>,
    pub host: Option<String>,
    pub port: Option<u32>,
    pub auto_config_url: Option<String>,
    pub auto_config_script: Option<String>,
}

impl ProxyConfig {
    pub fn direct() -> Self {
        Self {
            proxy_type: Some(TYPE_NONE.into()),
            ..Default::default()
        }
    }

    pub fn proxy(kind: ProxyKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            proxy_type: Some(kind.as_str().into()),
            host: Some(host.into()),
            port: Some(port.into()),
            ..Default::default()
        }
    }

    pub fn auto_config_url(script_url: impl Into<String>) -> Self {
        Self {
            proxy_type: Some(TYPE_AUTO_CONFIG_URL.into()),
            auto_config_url: Some(script_url.into()),
            ..Default::default()
        }
    }

    pub fn auto_config_script(script: impl Into<String>) -> Self {
        Self {
            proxy_type: Some(TYPE_AUTO_CONFIG_SCRIPT.into()),
            auto_config_script: Some(script.into()),
            ..Default::default()
        }
    }

    pub fn with_type(proxy_type: impl Into<String>) -> Self {
        Self {
            proxy_type: Some(proxy_type.into()),
            ..Default::default()
        }
    }
}

impl fmt::Display for ProxyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ProxyConfigEntry::try_from(self) {
            Ok(entry) => write!(f, "{}", entry),
            Err(_) => write!(f, "invalid {}", self.proxy_type.as_deref().unwrap_or("untyped")),
        }
    }
}

/// A validated candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfigEntry {
    None,
    AutoConfigUrl { script_url: Url },
    AutoConfigScript { script: String },
    Static { kind: ProxyKind, host: String, port: u16 },
}

impl TryFrom<&ProxyConfig> for ProxyConfigEntry {
    type Error = ResolutionError;

    fn try_from(config: &ProxyConfig) -> Result<Self, Self::Error> {
        let raw_type = config.proxy_type.as_deref().ok_or(ResolutionError::Unexpected(None))?;

        match raw_type.to_ascii_lowercase().as_str() {
            TYPE_NONE => Ok(ProxyConfigEntry::None),
            TYPE_AUTO_CONFIG_URL => {
                let raw_url = config
                    .auto_config_url
                    .as_deref()
                    .ok_or(ResolutionError::Unexpected(None))?;
                let script_url = Url::parse(raw_url).map_err(|e| {
                    ResolutionError::unexpected(super::ProxyError::InvalidUri(format!("{}: {}", raw_url, e)))
                })?;
                Ok(ProxyConfigEntry::AutoConfigUrl { script_url })
            }
            TYPE_AUTO_CONFIG_SCRIPT => {
                let script = config
                    .auto_config_script
                    .clone()
                    .ok_or(ResolutionError::Unexpected(None))?;
                Ok(ProxyConfigEntry::AutoConfigScript { script })
            }
            TYPE_HTTP | TYPE_HTTPS | TYPE_SOCKS => {
                let kind = match raw_type.to_ascii_lowercase().as_str() {
                    TYPE_HTTP => ProxyKind::Http,
                    TYPE_HTTPS => ProxyKind::Https,
                    _ => ProxyKind::Socks,
                };
                let host = config
                    .host
                    .clone()
                    .filter(|h| !h.is_empty())
                    .ok_or(ResolutionError::Unexpected(None))?;
                let port = config
                    .port
                    .and_then(|p| u16::try_from(p).ok())
                    .ok_or(ResolutionError::Unexpected(None))?;
                Ok(ProxyConfigEntry::Static { kind, host, port })
            }
            _ => Err(ResolutionError::ProxyTypeUnsupported(raw_type.to_string())),
        }
    }
}

impl fmt::Display for ProxyConfigEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyConfigEntry::None => write!(f, "DIRECT"),
            ProxyConfigEntry::AutoConfigUrl { script_url } => write!(f, "PAC {}", script_url),
            ProxyConfigEntry::AutoConfigScript { script } => write!(f, "PAC script ({} bytes)", script.len()),
            ProxyConfigEntry::Static { kind, host, port } => write!(f, "{} {}:{}", kind, host, port),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: String, password: String) -> Self {
        Self { username, password }
    }

    pub fn to_basic_auth(&self) -> String {
        use base64::Engine;
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", base64::prelude::BASE64_STANDARD.encode(credentials))
    }
}

/// A usable proxy. Identity is `kind`, `host` and `port`; the credential lookup
/// attached by the resolver plays no part in equality.
#[derive(Clone)]
pub struct ResolvedProxy {
    pub kind: ProxyKind,
    pub host: String,
    pub port: u16,
    lookup: Option<Arc<dyn CredentialsPort>>,
}

impl ResolvedProxy {
    pub fn new(kind: ProxyKind, host: impl Into<String>, port: u16) -> Self {
        Self {
            kind,
            host: host.into(),
            port,
            lookup: None,
        }
    }

    pub fn with_credentials_lookup(mut self, lookup: Arc<dyn CredentialsPort>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Queries the credential store for this proxy's host. Nothing is cached here:
    /// every call goes back to the store, and a failing store reads as no credentials.
    pub fn credentials(&self) -> Option<Credentials> {
        let lookup = self.lookup.as_ref()?;
        match lookup.lookup(&self.host) {
            Ok(credentials) => credentials,
            Err(e) => {
                log::debug!("Credential lookup for {} failed: {}", self.host, e);
                None
            }
        }
    }
}

impl PartialEq for ResolvedProxy {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.host == other.host && self.port == other.port
    }
}

impl Eq for ResolvedProxy {}

impl Hash for ResolvedProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
        self.host.hash(state);
        self.port.hash(state);
    }
}

impl fmt::Debug for ResolvedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedProxy")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl fmt::Display for ResolvedProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.kind, self.host, self.port)
    }
}

/// A successful resolution step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyRoute {
    Direct,
    Proxy(ResolvedProxy),
}

impl fmt::Display for ProxyRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyRoute::Direct => write!(f, "DIRECT"),
            ProxyRoute::Proxy(proxy) => write!(f, "PROXY {}", proxy),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Direct,
    Proxy(ResolvedProxy),
    Failed(ResolutionError),
}

impl ResolutionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ResolutionOutcome::Failed(_))
    }

    pub fn proxy(&self) -> Option<&ResolvedProxy> {
        match self {
            ResolutionOutcome::Proxy(proxy) => Some(proxy),
            _ => None,
        }
    }
}

impl From<ProxyRoute> for ResolutionOutcome {
    fn from(route: ProxyRoute) -> Self {
        match route {
            ProxyRoute::Direct => ResolutionOutcome::Direct,
            ProxyRoute::Proxy(proxy) => ResolutionOutcome::Proxy(proxy),
        }
    }
}

impl From<std::result::Result<ProxyRoute, ResolutionError>> for ResolutionOutcome {
    fn from(result: std::result::Result<ProxyRoute, ResolutionError>) -> Self {
        match result {
            Ok(route) => route.into(),
            Err(e) => ResolutionOutcome::Failed(e),
        }
    }
}

impl fmt::Display for ResolutionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionOutcome::Direct => write!(f, "DIRECT"),
            ResolutionOutcome::Proxy(proxy) => write!(f, "PROXY {}", proxy),
            ResolutionOutcome::Failed(e) => write!(f, "FAILED {}", e),
        }
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AuthRule {
    pub remote_pattern: String,
    pub username: String,
    pub password_command: String,
}
