mod settings;
mod static_list;

pub use settings::{ProxyEndpoint, ProxySettings, SettingsCandidateSource};
pub use static_list::StaticCandidateSource;
