pub mod candidates;
pub mod credentials;
pub mod pac;

pub use candidates::CandidateSourcePort;
pub use credentials::CredentialsPort;
pub use pac::{PacExecutorPort, PacFetcherPort};
