use crate::domain::{NormalizedUrl, ProxyConfig};

/// Port listing the proxy configurations that apply to a URL, highest priority first
pub trait CandidateSourcePort: Send + Sync {
    /// Get the candidate list for a normalized target URL
    ///
    /// Returns None when no proxy information is available at all. An empty list
    /// means the same thing to the resolver.
    fn candidates(&self, url: &NormalizedUrl) -> Option<Vec<ProxyConfig>>;
}
