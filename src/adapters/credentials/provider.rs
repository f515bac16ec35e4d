use crate::domain::{AuthRule, Credentials, ProxyError, Result};
use crate::ports::CredentialsPort;
use lru::LruCache;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::process::Command;
use std::sync::Mutex;

const CACHE_SIZE: usize = 5;

/// Credential store built from auth rules, each rule's password coming from a shell
/// command run once at construction.
pub struct CredentialProvider {
    rules: HashMap<String, (String, String)>,
    cache: Mutex<LruCache<String, Option<Credentials>>>,
}

impl CredentialProvider {
    pub fn new(auth_rules: Vec<AuthRule>) -> Result<Self> {
        let mut rules = HashMap::new();

        for rule in auth_rules {
            let password = Self::execute_password_command(&rule.password_command)?;
            if password.is_empty() {
                log::error!("Password command for {} returned an empty password.", rule.remote_pattern);
                return Err(ProxyError::AuthenticationFailed(format!(
                    "empty password for {}",
                    rule.remote_pattern
                )));
            }
            rules.insert(rule.remote_pattern, (rule.username, password));
        }

        Ok(Self::from_entries(rules))
    }

    fn from_entries(rules: HashMap<String, (String, String)>) -> Self {
        let size = NonZeroUsize::new(CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        Self {
            rules,
            cache: Mutex::new(LruCache::new(size)),
        }
    }

    fn execute_password_command(cmd: &str) -> Result<String> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(cmd)
            .output()
            .map_err(|e| ProxyError::AuthenticationFailed(format!("Command failed: {}", e)))?;

        String::from_utf8(output.stdout)
            .map(|s| s.trim_end().to_string())
            .map_err(|e| ProxyError::AuthenticationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Exact match on the host, then on each parent domain in turn:
    /// `proxy.corp.example` tries `.corp.example` and `.example` next.
    fn find_credentials_for_host(&self, host: &str) -> Option<Credentials> {
        let mut candidate = host;

        while !candidate.is_empty() {
            if let Some((username, password)) = self.rules.get(candidate) {
                log::debug!("Found credentials for host {}: {}", host, username);
                return Some(Credentials::new(username.clone(), password.clone()));
            }
            candidate = candidate.trim_start_matches('.').trim_start_matches(|ch| ch != '.');
        }

        None
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }
}

impl CredentialsPort for CredentialProvider {
    fn lookup(&self, host: &str) -> Result<Option<Credentials>> {
        let host = host.to_ascii_lowercase();

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&host) {
                return Ok(cached.clone());
            }
        }

        let creds = self.find_credentials_for_host(&host);

        if let Ok(mut cache) = self.cache.lock() {
            cache.put(host, creds.clone());
        }
        Ok(creds)
    }
}
