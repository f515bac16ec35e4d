use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use proxyresolver::adapters::{parse_directives, StaticCandidateSource};
use proxyresolver::config::Config;
use proxyresolver::domain::{PacResultMode, ProxyConfig, ProxyResolver, ResolutionOutcome};
use proxyresolver::ports::CandidateSourcePort;

#[derive(Parser, Debug)]
#[clap(version = env!("PROXYRESOLVER_VERSION"), author = env!("CARGO_PKG_AUTHORS"))]
pub struct Opts {
    /// URLs to resolve a proxy for
    #[clap(required = true)]
    urls: Vec<String>,

    /// Configuration file (defaults to the platform configuration directory)
    #[clap(long, short = 'c')]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[clap(long, default_value = "info")]
    log_level: String,

    /// Use this candidate instead of the configured settings (repeatable):
    /// DIRECT, HTTP host:port, HTTPS host:port, SOCKS host:port or PAC url
    #[clap(long = "candidate", short = 'p', value_parser = parse_candidate)]
    candidates: Vec<ProxyConfig>,

    /// Only try the first proxy a PAC script returns
    #[clap(long)]
    first_only: bool,

    /// Maximum number of nested auto-configuration scripts
    #[clap(long)]
    max_depth: Option<usize>,

    /// Evaluate and print every candidate instead of stopping at the first route
    #[clap(long)]
    step: bool,

    /// Report whether credentials are stored for the resolved proxy
    #[clap(long)]
    credentials: bool,
}

fn parse_candidate(spec: &str) -> Result<ProxyConfig, String> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err("candidate must not be empty".to_string());
    }
    if spec.contains(';') {
        return Err(format!("expected a single candidate, got {:?}", spec));
    }
    match spec.split_once(char::is_whitespace) {
        Some((keyword, url)) if keyword.eq_ignore_ascii_case("PAC") => Ok(ProxyConfig::auto_config_url(url.trim())),
        _ => parse_directives(spec)
            .into_iter()
            .next()
            .ok_or_else(|| format!("invalid candidate {:?}", spec)),
    }
}

async fn resolve(resolver: &ProxyResolver, url: &str, show_credentials: bool) -> bool {
    let outcome = resolver.resolve(url).await;
    println!("{}: {}", url, outcome);

    if show_credentials {
        if let ResolutionOutcome::Proxy(proxy) = &outcome {
            match proxy.credentials() {
                Some(creds) => println!("  credentials: {}", creds.username),
                None => println!("  credentials: none"),
            }
        }
    }
    !outcome.is_failed()
}

async fn step_through(resolver: &ProxyResolver, url: &str) -> bool {
    let mut walk = match resolver.walk(url) {
        Ok(walk) => walk,
        Err(e) => {
            println!("{}: FAILED {}", url, e);
            return false;
        }
    };

    println!("{} ({} candidates)", walk.url(), walk.remaining());
    while let Some(step) = walk.advance().await {
        match step.result {
            Ok(route) => println!("  #{} {}: {}", step.index, step.config, route),
            Err(e) => println!("  #{} {}: FAILED {}", step.index, step.config, e),
        }
    }

    match walk.finish() {
        Some(e) => {
            println!("  {}", e);
            false
        }
        None => true,
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let opts: Opts = Opts::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opts.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut config = Config::load(opts.config.as_deref())?;
    if opts.first_only {
        config.pac_results = PacResultMode::FirstOnly;
    }
    if let Some(depth) = opts.max_depth {
        config.max_indirection_depth = depth;
    }

    let candidates: Arc<dyn CandidateSourcePort> = if opts.candidates.is_empty() {
        config.candidate_source()
    } else {
        info!("Using {} candidates from the command line", opts.candidates.len());
        Arc::new(StaticCandidateSource::new(opts.candidates.clone()))
    };
    let resolver = config.build_resolver(candidates)?;

    let mut failed = 0;
    for url in &opts.urls {
        let resolved = if opts.step {
            step_through(&resolver, url).await
        } else {
            resolve(&resolver, url, opts.credentials).await
        };
        if !resolved {
            failed += 1;
        }
    }

    if failed > 0 {
        return Err(format!("{} of {} URLs could not be resolved", failed, opts.urls.len()).into());
    }
    Ok(())
}
