#![cfg(test)]
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use url::Url;

use proxyresolver::domain::{Credentials, NormalizedUrl, ProxyConfig, ProxyError, ProxyResolver, Result};
use proxyresolver::ports::{CandidateSourcePort, CredentialsPort, PacExecutorPort, PacFetcherPort};

pub const SCRIPT_URL: &str = "https://autoconf.server.com/proxy.pac";
pub const SCRIPT_CONTENTS: &str = "function FindProxyForURL(url, host) { return \"PROXY auto-http.proxy.com:8000\"; }";

#[derive(Default)]
pub struct MockCandidateSource {
    test_config: Mutex<Option<Vec<ProxyConfig>>>,
    requested: Mutex<Vec<String>>,
}

impl MockCandidateSource {
    pub fn set_test_config(&self, config: Option<Vec<ProxyConfig>>) {
        *self.test_config.lock().unwrap() = config;
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl CandidateSourcePort for MockCandidateSource {
    fn candidates(&self, url: &NormalizedUrl) -> Option<Vec<ProxyConfig>> {
        self.requested.lock().unwrap().push(url.to_string());
        self.test_config.lock().unwrap().clone()
    }
}

/// Serves scripts from memory; URLs it does not know fail like a refused connection.
#[derive(Default)]
pub struct MockPacFetcher {
    scripts: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl MockPacFetcher {
    pub fn with_script(self, url: &str, script: &str) -> Self {
        self.scripts.lock().unwrap().insert(url.to_string(), script.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PacFetcherPort for MockPacFetcher {
    async fn fetch(&self, script_url: &Url) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        match self.scripts.lock().unwrap().get(script_url.as_str()) {
            Some(script) => Ok(Some(script.clone())),
            None => Err(ProxyError::FetchFailed(format!("connection refused: {}", script_url))),
        }
    }
}

/// Answers with the list registered for the exact script text.
#[derive(Default)]
pub struct MockPacExecutor {
    answers: Mutex<HashMap<String, Vec<ProxyConfig>>>,
    targets: Mutex<Vec<String>>,
}

impl MockPacExecutor {
    pub fn with_answer(self, script: &str, answer: Vec<ProxyConfig>) -> Self {
        self.answers.lock().unwrap().insert(script.to_string(), answer);
        self
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

impl PacExecutorPort for MockPacExecutor {
    fn execute(&self, script: &str, target: &Url) -> Result<Vec<ProxyConfig>> {
        self.targets.lock().unwrap().push(target.to_string());
        self.answers
            .lock()
            .unwrap()
            .get(script)
            .cloned()
            .ok_or_else(|| ProxyError::ScriptFailed("FindProxyForURL is not defined".into()))
    }
}

#[derive(Default)]
pub struct MockCredentials {
    stored: HashMap<String, Credentials>,
    lookups: AtomicUsize,
}

impl MockCredentials {
    pub fn with(mut self, host: &str, username: &str, password: &str) -> Self {
        self.stored
            .insert(host.to_string(), Credentials::new(username.to_string(), password.to_string()));
        self
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

impl CredentialsPort for MockCredentials {
    fn lookup(&self, host: &str) -> Result<Option<Credentials>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if host == "keychain.locked" {
            return Err(ProxyError::AuthenticationFailed("store is locked".into()));
        }
        Ok(self.stored.get(host).cloned())
    }
}

pub struct TestResolver {
    pub resolver: ProxyResolver,
    pub source: Arc<MockCandidateSource>,
    pub fetcher: Arc<MockPacFetcher>,
    pub executor: Arc<MockPacExecutor>,
    pub credentials: Arc<MockCredentials>,
}

impl TestResolver {
    pub fn new(fetcher: MockPacFetcher, executor: MockPacExecutor, credentials: MockCredentials) -> Self {
        let source = Arc::new(MockCandidateSource::default());
        let fetcher = Arc::new(fetcher);
        let executor = Arc::new(executor);
        let credentials = Arc::new(credentials);
        let resolver = ProxyResolver::new(source.clone(), fetcher.clone(), executor.clone(), credentials.clone());
        Self {
            resolver,
            source,
            fetcher,
            executor,
            credentials,
        }
    }

    pub fn with_candidates(candidates: Vec<ProxyConfig>) -> Self {
        let test = Self::new(
            MockPacFetcher::default(),
            MockPacExecutor::default(),
            MockCredentials::default(),
        );
        test.source.set_test_config(Some(candidates));
        test
    }
}
