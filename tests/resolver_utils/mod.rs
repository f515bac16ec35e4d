#![cfg(test)]
#![allow(dead_code)]
#![allow(unused_imports)]

pub mod fixtures;
pub mod mocks;

pub use fixtures::{create_pac_script, PacFileFixture};
pub use mocks::{MockCandidateSource, MockCredentials, MockPacExecutor, MockPacFetcher};
