pub mod candidates;
pub mod credentials;
pub mod pac;

pub use candidates::*;
pub use credentials::*;
pub use pac::*;
