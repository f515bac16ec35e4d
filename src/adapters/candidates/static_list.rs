use crate::domain::{NormalizedUrl, ProxyConfig};
use crate::ports::CandidateSourcePort;

/// Candidate source answering every URL with the same list.
#[derive(Debug, Clone, Default)]
pub struct StaticCandidateSource {
    candidates: Option<Vec<ProxyConfig>>,
}

impl StaticCandidateSource {
    pub fn new(candidates: Vec<ProxyConfig>) -> Self {
        Self {
            candidates: Some(candidates),
        }
    }

    /// A source that never has any proxy information.
    pub fn unavailable() -> Self {
        Self { candidates: None }
    }
}

impl CandidateSourcePort for StaticCandidateSource {
    fn candidates(&self, _url: &NormalizedUrl) -> Option<Vec<ProxyConfig>> {
        self.candidates.clone()
    }
}
