pub mod errors;
pub mod models;
pub mod normalizer;
pub mod service;

pub use errors::*;
pub use models::*;
pub use normalizer::{NormalizedUrl, SchemeNormalizer};
pub use service::{CandidateStep, CandidateWalk, PacResultMode, ProxyResolver, ResolverOptions};
