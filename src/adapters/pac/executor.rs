use crate::domain::{ProxyConfig, ProxyError, ProxyKind, Result};
use crate::ports::PacExecutorPort;
use js_sandbox::{JsValue, Script};
use url::Url;

const PAC_UTILS: &str = include_str!("pac_utils.js");

/// Runs PAC scripts in a fresh JavaScript sandbox for every evaluation.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsPacExecutor;

impl JsPacExecutor {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate a PAC file and return the raw directive string
    pub fn find_proxy_for_url(&self, pac_file: &str, url: &Url) -> Result<String> {
        let pac_payload = format!("{}\n{}", pac_file, PAC_UTILS);

        let mut script = Script::from_string(&pac_payload)
            .map_err(|e| ProxyError::ScriptFailed(format!("PAC script error: {}", e)))?;

        let host = url
            .host_str()
            .ok_or_else(|| ProxyError::InvalidUri(format!("Missing host in {}", url)))?;

        let eval_result: JsValue = script
            .call("FindProxyForURL", (url.to_string(), host.to_string()))
            .map_err(|e| ProxyError::ScriptFailed(format!("PAC execution error: {}", e)))?;

        Ok(eval_result.to_string().replace('"', ""))
    }
}

impl PacExecutorPort for JsPacExecutor {
    fn execute(&self, script: &str, target: &Url) -> Result<Vec<ProxyConfig>> {
        let directives = self.find_proxy_for_url(script, target)?;
        log::debug!("PAC answered \"{}\" for {}", directives, target);
        Ok(parse_directives(&directives))
    }
}

/// Convert a `FindProxyForURL` answer such as `PROXY a:8080; SOCKS b; DIRECT` into
/// proxy records, keeping the script's order.
pub fn parse_directives(directives: &str) -> Vec<ProxyConfig> {
    let proxies: Vec<ProxyConfig> = directives
        .split(';')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(parse_directive)
        .collect();

    if proxies.is_empty() {
        vec![ProxyConfig::direct()]
    } else {
        proxies
    }
}

fn parse_directive(directive: &str) -> ProxyConfig {
    let mut parts = directive.split_whitespace();
    let keyword = parts.next().unwrap_or_default();
    let address = parts.next();

    let kind = match keyword.to_ascii_uppercase().as_str() {
        "DIRECT" => return ProxyConfig::direct(),
        "PROXY" | "HTTP" => ProxyKind::Http,
        "HTTPS" => ProxyKind::Https,
        "SOCKS" | "SOCKS4" | "SOCKS5" => ProxyKind::Socks,
        _ => return ProxyConfig::with_type(keyword),
    };

    let (host, port) = match address {
        Some(address) => split_host_port(address, kind.default_port()),
        None => (None, None),
    };

    ProxyConfig {
        host,
        port,
        ..ProxyConfig::with_type(kind.as_str())
    }
}

fn split_host_port(address: &str, default_port: u16) -> (Option<String>, Option<u32>) {
    if let Some(rest) = address.strip_prefix('[') {
        // [v6]:port
        return match rest.split_once(']') {
            Some((host, tail)) => (Some(host.to_string()), parse_port(tail.strip_prefix(':'), default_port)),
            None => (None, None),
        };
    }

    match address.rsplit_once(':') {
        Some((host, port)) if !host.contains(':') => (Some(host.to_string()), parse_port(Some(port), default_port)),
        _ => (Some(address.to_string()), Some(default_port.into())),
    }
}

fn parse_port(raw: Option<&str>, default_port: u16) -> Option<u32> {
    match raw {
        None | Some("") => Some(default_port.into()),
        Some(port) => port.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mixed_directives() {
        let configs = parse_directives("PROXY proxy.corp:3128; SOCKS5 10.0.0.1:1080; HTTPS secure.corp; DIRECT");

        assert_eq!(
            configs,
            vec![
                ProxyConfig::proxy(ProxyKind::Http, "proxy.corp", 3128),
                ProxyConfig::proxy(ProxyKind::Socks, "10.0.0.1", 1080),
                ProxyConfig::proxy(ProxyKind::Https, "secure.corp", 443),
                ProxyConfig::direct(),
            ]
        );
    }

    #[test]
    fn test_empty_answer_means_direct() {
        assert_eq!(parse_directives(" ; "), vec![ProxyConfig::direct()]);
    }

    #[test]
    fn test_unknown_keyword_is_kept() {
        let configs = parse_directives("QUIC q.corp:443");

        assert_eq!(configs, vec![ProxyConfig::with_type("QUIC")]);
    }

    #[test]
    fn test_bad_port_is_left_invalid() {
        let configs = parse_directives("PROXY proxy.corp:http");

        assert_eq!(configs[0].host.as_deref(), Some("proxy.corp"));
        assert_eq!(configs[0].port, None);
    }

    #[test]
    fn test_ipv6_address() {
        let configs = parse_directives("PROXY [::1]:8080");

        assert_eq!(configs, vec![ProxyConfig::proxy(ProxyKind::Http, "::1", 8080)]);
    }

    #[test]
    fn test_missing_address() {
        let configs = parse_directives("PROXY");

        assert_eq!(configs[0].host, None);
    }

    #[test]
    fn test_evaluate_script() {
        let script = r#"
function FindProxyForURL(url, host) {
    if (isPlainHostName(host) || dnsDomainIs(host, ".intranet")) {
        return "DIRECT";
    }
    if (shExpMatch(host, "*.example.com")) {
        return "PROXY auto-http.proxy.com:8000; DIRECT";
    }
    return "SOCKS socks.proxy.com:8082";
}
"#;
        let executor = JsPacExecutor::new();

        let configs = executor
            .execute(script, &"https://www.example.com/".parse().unwrap())
            .unwrap();
        assert_eq!(
            configs,
            vec![
                ProxyConfig::proxy(ProxyKind::Http, "auto-http.proxy.com", 8000),
                ProxyConfig::direct(),
            ]
        );

        let configs = executor.execute(script, &"http://wiki.intranet/".parse().unwrap()).unwrap();
        assert_eq!(configs, vec![ProxyConfig::direct()]);
    }
}
