use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info_span, warn, Instrument, Span};
use url::Url;
use uuid::Uuid;

use super::normalizer::{default_scheme_rules, NormalizedUrl, SchemeNormalizer};
use super::{
    ProxyConfig, ProxyConfigEntry, ProxyError, ProxyKind, ProxyRoute, ResolutionError, ResolutionOutcome,
    ResolvedProxy,
};
use crate::ports::{CandidateSourcePort, CredentialsPort, PacExecutorPort, PacFetcherPort};

pub const DEFAULT_MAX_INDIRECTION_DEPTH: usize = 5;

/// How much of a PAC script's answer is tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PacResultMode {
    /// Every proxy the script returns is a fallback for the one before it.
    #[default]
    Fallback,
    /// Only the script's first proxy is tried.
    FirstOnly,
}

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    pub scheme_rules: HashMap<String, String>,
    pub max_indirection_depth: usize,
    pub pac_results: PacResultMode,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            scheme_rules: default_scheme_rules(),
            max_indirection_depth: DEFAULT_MAX_INDIRECTION_DEPTH,
            pac_results: PacResultMode::default(),
        }
    }
}

/// Picks the proxy to use for a URL by walking the candidates reported for it,
/// following auto-configuration scripts, until one of them yields a route.
///
/// The resolver keeps no state between calls. Every [`resolve`](Self::resolve) or
/// [`walk`](Self::walk) owns its remaining candidates and the errors collected so far.
#[derive(Clone)]
pub struct ProxyResolver {
    candidates: Arc<dyn CandidateSourcePort>,
    fetcher: Arc<dyn PacFetcherPort>,
    executor: Arc<dyn PacExecutorPort>,
    credentials: Arc<dyn CredentialsPort>,
    normalizer: SchemeNormalizer,
    max_indirection_depth: usize,
    pac_results: PacResultMode,
}

impl ProxyResolver {
    pub fn new(
        candidates: Arc<dyn CandidateSourcePort>,
        fetcher: Arc<dyn PacFetcherPort>,
        executor: Arc<dyn PacExecutorPort>,
        credentials: Arc<dyn CredentialsPort>,
    ) -> Self {
        Self {
            candidates,
            fetcher,
            executor,
            credentials,
            normalizer: SchemeNormalizer::default(),
            max_indirection_depth: DEFAULT_MAX_INDIRECTION_DEPTH,
            pac_results: PacResultMode::default(),
        }
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.normalizer = SchemeNormalizer::new(options.scheme_rules);
        self.max_indirection_depth = options.max_indirection_depth;
        self.pac_results = options.pac_results;
        self
    }

    /// Resolve the route for `url`, falling back through every candidate until one
    /// succeeds.
    pub async fn resolve(&self, url: &str) -> ResolutionOutcome {
        let mut walk = match self.walk(url) {
            Ok(walk) => walk,
            Err(e) => {
                warn!("Cannot resolve proxy for {}: {}", url, e);
                return ResolutionOutcome::Failed(e);
            }
        };

        while let Some(step) = walk.advance().await {
            if let Ok(route) = step.result {
                return route.into();
            }
        }

        let span = walk.span.clone();
        let errors = walk.into_errors();
        span.in_scope(|| warn!("All {} proxy candidates failed", errors.len()));
        ResolutionOutcome::Failed(ResolutionError::AllFailed(errors))
    }

    /// Start a caller-driven resolution of `url`.
    ///
    /// Normalization and candidate listing happen here; each candidate is then only
    /// evaluated when [`CandidateWalk::advance`] is called.
    pub fn walk(&self, url: &str) -> Result<CandidateWalk, ResolutionError> {
        let url = self.normalizer.normalize(url)?;
        let span = info_span!("resolve", session = %Uuid::new_v4(), url = %url);

        let candidates = span
            .in_scope(|| self.candidates.candidates(&url))
            .filter(|candidates| !candidates.is_empty())
            .ok_or(ResolutionError::Unexpected(None))?;
        span.in_scope(|| debug!("{} proxy candidates for {}", candidates.len(), url));

        Ok(CandidateWalk {
            resolver: self.clone(),
            url,
            remaining: candidates.into_iter(),
            index: 0,
            errors: Vec::new(),
            succeeded: false,
            span,
        })
    }

    fn evaluate<'a>(
        &'a self,
        config: &'a ProxyConfig,
        target: &'a Url,
        depth: usize,
    ) -> BoxFuture<'a, Result<ProxyRoute, ResolutionError>> {
        Box::pin(async move {
            let entry = ProxyConfigEntry::try_from(config)?;
            debug!("Evaluating candidate {} (depth {})", entry, depth);

            match entry {
                ProxyConfigEntry::None => Ok(ProxyRoute::Direct),
                ProxyConfigEntry::Static { kind, host, port } => Ok(ProxyRoute::Proxy(self.resolved(kind, host, port))),
                ProxyConfigEntry::AutoConfigUrl { script_url } => {
                    self.check_depth(depth)?;
                    let script = self.fetch_script(&script_url).await?;
                    self.evaluate_script(&script, target, depth).await
                }
                ProxyConfigEntry::AutoConfigScript { script } => {
                    self.check_depth(depth)?;
                    self.evaluate_script(&script, target, depth).await
                }
            }
        })
    }

    fn check_depth(&self, depth: usize) -> Result<(), ResolutionError> {
        if depth >= self.max_indirection_depth {
            return Err(ResolutionError::IndirectionLimitExceeded(self.max_indirection_depth));
        }
        Ok(())
    }

    async fn fetch_script(&self, script_url: &Url) -> Result<String, ResolutionError> {
        match self.fetcher.fetch(script_url).await? {
            Some(script) => Ok(script),
            None => Err(ResolutionError::unexpected(ProxyError::FetchFailed(format!(
                "no script available at {}",
                script_url
            )))),
        }
    }

    async fn evaluate_script(&self, script: &str, target: &Url, depth: usize) -> Result<ProxyRoute, ResolutionError> {
        let mut answer = self.executor.execute(script, target)?;
        if self.pac_results == PacResultMode::FirstOnly {
            answer.truncate(1);
        }
        if answer.is_empty() {
            return Err(ResolutionError::Unexpected(None));
        }

        let mut errors = Vec::new();
        for config in &answer {
            match self.evaluate(config, target, depth + 1).await {
                Ok(route) => return Ok(route),
                Err(e) => {
                    debug!("PAC suggestion {} failed: {}", config, e);
                    errors.push(e);
                }
            }
        }

        if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ResolutionError::AllFailed(errors))
        }
    }

    fn resolved(&self, kind: ProxyKind, host: String, port: u16) -> ResolvedProxy {
        ResolvedProxy::new(kind, host, port).with_credentials_lookup(self.credentials.clone())
    }
}

/// The outcome of evaluating one top-level candidate.
#[derive(Debug, Clone)]
pub struct CandidateStep {
    pub index: usize,
    pub config: ProxyConfig,
    pub result: Result<ProxyRoute, ResolutionError>,
}

/// A resolution advanced one candidate at a time by the caller.
///
/// Nothing moves unless [`advance`](Self::advance) is called; dropping the walk stops
/// the resolution.
pub struct CandidateWalk {
    resolver: ProxyResolver,
    url: NormalizedUrl,
    remaining: std::vec::IntoIter<ProxyConfig>,
    index: usize,
    errors: Vec<ResolutionError>,
    succeeded: bool,
    span: Span,
}

impl CandidateWalk {
    pub fn url(&self) -> &NormalizedUrl {
        &self.url
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn errors(&self) -> &[ResolutionError] {
        &self.errors
    }

    /// Evaluate the next candidate, or return None once every candidate was tried.
    pub async fn advance(&mut self) -> Option<CandidateStep> {
        let config = self.remaining.next()?;
        let index = self.index;
        self.index += 1;

        let result = self
            .resolver
            .evaluate(&config, self.url.as_url(), 0)
            .instrument(self.span.clone())
            .await;

        match &result {
            Ok(route) => {
                self.succeeded = true;
                self.span.in_scope(|| debug!("Candidate #{} resolved to {}", index, route));
            }
            Err(e) => {
                self.span.in_scope(|| warn!("Candidate #{} ({}) failed: {}", index, config, e));
                self.errors.push(e.clone());
            }
        }

        Some(CandidateStep { index, config, result })
    }

    /// Close the walk. Returns the aggregated failure only when every candidate was
    /// tried and none succeeded; a walk stopped early reports nothing.
    pub fn finish(self) -> Option<ResolutionError> {
        if self.succeeded || self.remaining.len() > 0 {
            None
        } else {
            Some(ResolutionError::AllFailed(self.errors))
        }
    }

    pub fn into_errors(self) -> Vec<ResolutionError> {
        self.errors
    }
}
