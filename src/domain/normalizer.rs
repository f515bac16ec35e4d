use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use url::{Position, Url};

use super::ResolutionError;

/// A target URL whose scheme went through the [`SchemeNormalizer`].
///
/// Proxy settings are keyed by transport scheme, so candidate sources only ever see
/// this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl(Url);

impl NormalizedUrl {
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl Deref for NormalizedUrl {
    type Target = Url;

    fn deref(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub fn default_scheme_rules() -> HashMap<String, String> {
    let mut rules = HashMap::new();
    rules.insert("ws".to_string(), "http".to_string());
    rules.insert("wss".to_string(), "https".to_string());
    rules
}

#[derive(Debug, Clone)]
pub struct SchemeNormalizer {
    rules: HashMap<String, String>,
}

impl SchemeNormalizer {
    pub fn new(rules: HashMap<String, String>) -> Self {
        let rules = rules
            .into_iter()
            .map(|(from, to)| (from.to_ascii_lowercase(), to.to_ascii_lowercase()))
            .collect();
        Self { rules }
    }

    pub fn normalize(&self, url: &str) -> Result<NormalizedUrl, ResolutionError> {
        let parsed = Url::parse(url).map_err(|e| ResolutionError::NormalizationFailure(format!("{}: {}", url, e)))?;
        self.normalize_url(parsed)
    }

    pub fn normalize_url(&self, url: Url) -> Result<NormalizedUrl, ResolutionError> {
        let target = match self.rules.get(url.scheme()) {
            Some(target) if target != url.scheme() => target,
            _ => return Ok(NormalizedUrl(url)),
        };

        // Url::set_scheme refuses special/non-special swaps, so rebuild from text.
        let rewritten = format!("{}{}", target, &url[Position::AfterScheme..]);
        Url::parse(&rewritten)
            .map(NormalizedUrl)
            .map_err(|e| ResolutionError::NormalizationFailure(format!("{}: {}", rewritten, e)))
    }
}

impl Default for SchemeNormalizer {
    fn default() -> Self {
        Self::new(default_scheme_rules())
    }
}
