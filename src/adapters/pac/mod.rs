mod executor;
mod fetcher;

pub use executor::{parse_directives, JsPacExecutor};
pub use fetcher::{default_supported_schemes, UrlPacFetcher, DEFAULT_PAC_CACHE_SIZE, DEFAULT_PAC_TIMEOUT};
