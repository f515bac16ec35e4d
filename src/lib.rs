//! Proxy resolution for outgoing requests.
//!
//! [`domain::ProxyResolver`] takes the proxy candidates reported for a URL, follows
//! auto-configuration (PAC) scripts, and falls back from one candidate to the next
//! until it finds a direct route or a usable proxy. Candidate listing, PAC retrieval,
//! PAC execution and credential storage sit behind the traits in [`ports`];
//! [`adapters`] provides the default implementations.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod ports;
