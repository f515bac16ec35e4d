use std::fmt;

/// Failures reported by the collaborators the resolver talks to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyError {
    InvalidUri(String),
    FetchFailed(String),
    ScriptFailed(String),
    AuthenticationFailed(String),
    Config(String),
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::InvalidUri(msg) => write!(f, "Invalid URI: {}", msg),
            ProxyError::FetchFailed(msg) => write!(f, "PAC fetch failed: {}", msg),
            ProxyError::ScriptFailed(msg) => write!(f, "PAC execution failed: {}", msg),
            ProxyError::AuthenticationFailed(msg) => write!(f, "Authentication failed: {}", msg),
            ProxyError::Config(msg) => write!(f, "Configuration error: {}", msg),
        }
    }
}

impl std::error::Error for ProxyError {}

pub type Result<T> = std::result::Result<T, ProxyError>;

/// Errors produced while resolving a proxy for a URL.
///
/// Every variant except [`ResolutionError::NormalizationFailure`] is recorded per
/// candidate; only [`ResolutionError::AllFailed`] and the no-candidate case ever reach
/// the caller as a terminal outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    NormalizationFailure(String),
    Unexpected(Option<ProxyError>),
    ProxyTypeUnsupported(String),
    IndirectionLimitExceeded(usize),
    AllFailed(Vec<ResolutionError>),
}

impl ResolutionError {
    pub fn unexpected(cause: ProxyError) -> Self {
        ResolutionError::Unexpected(Some(cause))
    }

    /// Per-candidate errors in trial order, empty for anything but `AllFailed`.
    pub fn failures(&self) -> &[ResolutionError] {
        match self {
            ResolutionError::AllFailed(errors) => errors,
            _ => &[],
        }
    }
}

impl fmt::Display for ResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionError::NormalizationFailure(url) => write!(f, "Cannot normalize URL: {}", url),
            ResolutionError::Unexpected(None) => write!(f, "Unexpected resolution error"),
            ResolutionError::Unexpected(Some(cause)) => write!(f, "Unexpected resolution error: {}", cause),
            ResolutionError::ProxyTypeUnsupported(raw) => write!(f, "Unsupported proxy type: {}", raw),
            ResolutionError::IndirectionLimitExceeded(limit) => {
                write!(f, "Auto-configuration nested deeper than {} levels", limit)
            }
            ResolutionError::AllFailed(errors) => {
                write!(f, "All {} proxy candidates failed", errors.len())?;
                for (i, error) in errors.iter().enumerate() {
                    write!(f, "; #{}: {}", i, error)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ResolutionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolutionError::Unexpected(Some(cause)) => Some(cause),
            _ => None,
        }
    }
}

impl From<ProxyError> for ResolutionError {
    fn from(cause: ProxyError) -> Self {
        ResolutionError::unexpected(cause)
    }
}
