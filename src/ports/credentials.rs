use crate::domain::{Credentials, Result};

/// Port for looking up stored proxy credentials
pub trait CredentialsPort: Send + Sync {
    /// Get credentials for a specific proxy host
    ///
    /// Returns None if no credentials are stored for this host
    fn lookup(&self, host: &str) -> Result<Option<Credentials>>;
}
