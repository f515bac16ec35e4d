use crate::domain::{NormalizedUrl, ProxyConfig, ProxyKind};
use crate::ports::CandidateSourcePort;
use ipnet::IpNet;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use url::{Host, Url};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyEndpoint {
    pub host: String,
    pub port: u16,
}

impl ProxyEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self { host: host.into(), port }
    }

    /// Parse `host:port`, `scheme://host:port` or a bare host.
    pub fn parse(raw: &str, default_port: u16) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let (url, port) = if raw.contains("://") {
            let url = Url::parse(raw).ok()?;
            let port = url.port_or_known_default();
            (url, port)
        } else {
            // non-special scheme so an explicit :80 or :443 is kept
            let url = Url::parse(&format!("proxy://{}", raw)).ok()?;
            let port = url.port();
            (url, port)
        };

        let host = url.host_str()?.trim_start_matches('[').trim_end_matches(']').to_string();
        let port = port.unwrap_or(default_port);
        Some(Self::new(host, port))
    }
}

/// Proxy settings shaped like an operating system's network preferences.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub auto_config_url: Option<String>,
    pub auto_config_script: Option<String>,
    pub http: Option<ProxyEndpoint>,
    pub https: Option<ProxyEndpoint>,
    pub socks: Option<ProxyEndpoint>,
    pub exceptions: Vec<String>,
    pub exclude_simple_hostnames: bool,
}

impl ProxySettings {
    /// Settings from `HTTP_PROXY`, `HTTPS_PROXY`, `ALL_PROXY` and `NO_PROXY`
    /// (lower-case names are honoured too).
    pub fn from_env() -> Self {
        Self::from_vars(|name| {
            std::env::var(name)
                .or_else(|_| std::env::var(name.to_ascii_lowercase()))
                .ok()
        })
    }

    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Self {
            http: var("HTTP_PROXY").and_then(|v| ProxyEndpoint::parse(&v, ProxyKind::Http.default_port())),
            https: var("HTTPS_PROXY").and_then(|v| ProxyEndpoint::parse(&v, ProxyKind::Https.default_port())),
            ..Default::default()
        };

        if let Some(all) = var("ALL_PROXY") {
            if all.trim_start().to_ascii_lowercase().starts_with("socks") {
                settings.socks = ProxyEndpoint::parse(&all, ProxyKind::Socks.default_port());
            } else {
                let endpoint = ProxyEndpoint::parse(&all, ProxyKind::Http.default_port());
                settings.http = settings.http.or_else(|| endpoint.clone());
                settings.https = settings.https.or(endpoint);
            }
        }

        if let Some(no_proxy) = var("NO_PROXY") {
            settings.exceptions = no_proxy
                .split(',')
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(String::from)
                .collect();
        }

        settings
    }

    /// Fill every unset field of `self` from `other`.
    pub fn or(self, other: ProxySettings) -> Self {
        let mut exceptions = self.exceptions;
        exceptions.extend(other.exceptions);
        Self {
            auto_config_url: self.auto_config_url.or(other.auto_config_url),
            auto_config_script: self.auto_config_script.or(other.auto_config_script),
            http: self.http.or(other.http),
            https: self.https.or(other.https),
            socks: self.socks.or(other.socks),
            exceptions,
            exclude_simple_hostnames: self.exclude_simple_hostnames || other.exclude_simple_hostnames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Exception {
    Any,
    Host(String),
    Domain(String),
    Net(IpNet),
}

impl Exception {
    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.is_empty() {
            return None;
        }
        if raw == "*" {
            return Some(Exception::Any);
        }
        if let Ok(net) = raw.parse::<IpNet>() {
            return Some(Exception::Net(net));
        }
        if let Ok(ip) = raw.trim_start_matches('[').trim_end_matches(']').parse::<IpAddr>() {
            let prefix = if ip.is_ipv4() { 32 } else { 128 };
            return IpNet::new(ip, prefix).ok().map(Exception::Net);
        }
        if let Some(domain) = raw.strip_prefix("*.") {
            return Some(Exception::Domain(domain.to_string()));
        }
        if let Some(domain) = raw.strip_prefix('.') {
            return Some(Exception::Domain(domain.to_string()));
        }
        Some(Exception::Host(raw))
    }

    fn matches(&self, host: &Host<&str>) -> bool {
        match (self, host) {
            (Exception::Any, _) => true,
            (Exception::Net(net), Host::Ipv4(ip)) => net.contains(&IpAddr::V4(*ip)),
            (Exception::Net(net), Host::Ipv6(ip)) => net.contains(&IpAddr::V6(*ip)),
            (Exception::Host(name), Host::Domain(domain)) => {
                let domain = domain.to_ascii_lowercase();
                domain == *name || is_subdomain(&domain, name)
            }
            (Exception::Domain(suffix), Host::Domain(domain)) => is_subdomain(&domain.to_ascii_lowercase(), suffix),
            _ => false,
        }
    }
}

fn is_subdomain(host: &str, domain: &str) -> bool {
    host.len() > domain.len() && host.ends_with(domain) && host[..host.len() - domain.len()].ends_with('.')
}

/// Candidate source replaying [`ProxySettings`] the way system proxy preferences are
/// applied: bypass rules first, then auto-configuration, then the static proxies.
pub struct SettingsCandidateSource {
    settings: ProxySettings,
    exceptions: Vec<Exception>,
}

impl SettingsCandidateSource {
    pub fn new(settings: ProxySettings) -> Self {
        let exceptions = settings
            .exceptions
            .iter()
            .filter_map(|raw| {
                let exception = Exception::parse(raw);
                if exception.is_none() {
                    log::warn!("Ignoring empty proxy exception");
                }
                exception
            })
            .collect();
        Self { settings, exceptions }
    }

    fn is_bypassed(&self, host: &Host<&str>) -> bool {
        if self.settings.exclude_simple_hostnames {
            if let Host::Domain(domain) = host {
                if !domain.contains('.') {
                    return true;
                }
            }
        }
        self.exceptions.iter().any(|exception| exception.matches(host))
    }
}

impl CandidateSourcePort for SettingsCandidateSource {
    fn candidates(&self, url: &NormalizedUrl) -> Option<Vec<ProxyConfig>> {
        let host = match url.host() {
            Some(host) => host,
            None => return Some(vec![ProxyConfig::direct()]),
        };

        if self.is_bypassed(&host) {
            log::debug!("{} matches a proxy exception", host);
            return Some(vec![ProxyConfig::direct()]);
        }

        let mut candidates = Vec::new();
        if let Some(pac_url) = &self.settings.auto_config_url {
            candidates.push(ProxyConfig::auto_config_url(pac_url.as_str()));
        }
        if let Some(script) = &self.settings.auto_config_script {
            candidates.push(ProxyConfig::auto_config_script(script.as_str()));
        }

        let scheme_proxy = match url.scheme() {
            "http" => self.settings.http.as_ref().map(|e| (ProxyKind::Http, e)),
            "https" => self.settings.https.as_ref().map(|e| (ProxyKind::Https, e)),
            _ => None,
        };
        if let Some((kind, endpoint)) = scheme_proxy {
            candidates.push(ProxyConfig::proxy(kind, endpoint.host.as_str(), endpoint.port));
        }
        if let Some(endpoint) = &self.settings.socks {
            candidates.push(ProxyConfig::proxy(ProxyKind::Socks, endpoint.host.as_str(), endpoint.port));
        }

        if candidates.is_empty() {
            candidates.push(ProxyConfig::direct());
        }
        Some(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SchemeNormalizer;
    use std::collections::HashMap;

    fn url(raw: &str) -> NormalizedUrl {
        SchemeNormalizer::default().normalize(raw).unwrap()
    }

    fn full_settings() -> ProxySettings {
        ProxySettings {
            auto_config_url: Some("http://pac.corp/proxy.pac".into()),
            http: Some(ProxyEndpoint::new("http.proxy.com", 8080)),
            https: Some(ProxyEndpoint::new("https.proxy.com", 8081)),
            socks: Some(ProxyEndpoint::new("socks.proxy.com", 8082)),
            exceptions: vec!["*.local".into(), "10.0.0.0/8".into(), "internal.corp".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_candidate_order() {
        let source = SettingsCandidateSource::new(full_settings());

        assert_eq!(
            source.candidates(&url("https://example.com")),
            Some(vec![
                ProxyConfig::auto_config_url("http://pac.corp/proxy.pac"),
                ProxyConfig::proxy(ProxyKind::Https, "https.proxy.com", 8081),
                ProxyConfig::proxy(ProxyKind::Socks, "socks.proxy.com", 8082),
            ])
        );
        assert_eq!(
            source.candidates(&url("ws://example.com")).unwrap().get(1),
            Some(&ProxyConfig::proxy(ProxyKind::Http, "http.proxy.com", 8080))
        );
    }

    #[test]
    fn test_exceptions_bypass_proxies() {
        let source = SettingsCandidateSource::new(full_settings());
        let direct = Some(vec![ProxyConfig::direct()]);

        assert_eq!(source.candidates(&url("http://printer.local/")), direct);
        assert_eq!(source.candidates(&url("http://10.1.2.3/")), direct);
        assert_eq!(source.candidates(&url("http://internal.corp/")), direct);
        assert_eq!(source.candidates(&url("http://git.internal.corp/")), direct);
        assert_ne!(source.candidates(&url("http://notinternal.corp/")), direct);
    }

    #[test]
    fn test_simple_hostnames() {
        let source = SettingsCandidateSource::new(ProxySettings {
            exclude_simple_hostnames: true,
            ..full_settings()
        });

        assert_eq!(source.candidates(&url("http://intranet/")), Some(vec![ProxyConfig::direct()]));
    }

    #[test]
    fn test_nothing_configured_is_direct() {
        let source = SettingsCandidateSource::new(ProxySettings::default());

        assert_eq!(source.candidates(&url("http://example.com/")), Some(vec![ProxyConfig::direct()]));
    }

    #[test]
    fn test_settings_from_vars() {
        let mut vars = HashMap::new();
        vars.insert("HTTP_PROXY", "http://proxy.corp:3128");
        vars.insert("ALL_PROXY", "socks5://socks.corp");
        vars.insert("NO_PROXY", "localhost, .corp.net,");

        let settings = ProxySettings::from_vars(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(settings.http, Some(ProxyEndpoint::new("proxy.corp", 3128)));
        assert_eq!(settings.https, None);
        assert_eq!(settings.socks, Some(ProxyEndpoint::new("socks.corp", 1080)));
        assert_eq!(settings.exceptions, vec!["localhost".to_string(), ".corp.net".to_string()]);
    }

    #[test]
    fn test_schemeless_endpoints_use_their_kind_port() {
        let mut vars = HashMap::new();
        vars.insert("HTTP_PROXY", "proxy.corp");
        vars.insert("HTTPS_PROXY", "secure.corp");

        let settings = ProxySettings::from_vars(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(settings.http, Some(ProxyEndpoint::new("proxy.corp", 80)));
        assert_eq!(settings.https, Some(ProxyEndpoint::new("secure.corp", 443)));
        assert_eq!(
            ProxyEndpoint::parse("secure.corp:80", ProxyKind::Https.default_port()),
            Some(ProxyEndpoint::new("secure.corp", 80))
        );
        assert_eq!(
            ProxyEndpoint::parse("[::1]:3128", ProxyKind::Http.default_port()),
            Some(ProxyEndpoint::new("::1", 3128))
        );
    }

    #[test]
    fn test_settings_merge_prefers_self() {
        let configured = ProxySettings {
            http: Some(ProxyEndpoint::new("a", 1)),
            ..Default::default()
        };
        let env = ProxySettings {
            http: Some(ProxyEndpoint::new("b", 2)),
            https: Some(ProxyEndpoint::new("c", 3)),
            ..Default::default()
        };

        let merged = configured.or(env);

        assert_eq!(merged.http, Some(ProxyEndpoint::new("a", 1)));
        assert_eq!(merged.https, Some(ProxyEndpoint::new("c", 3)));
    }
}
