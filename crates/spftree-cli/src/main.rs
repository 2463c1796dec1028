//! spftree - SPF include tree resolver

use anyhow::Context;
use clap::Parser;
use spftree_common::config::LoggingConfig;
use spftree_common::{Config, Result};
use spftree_core::SpfTreeService;
use std::path::PathBuf;
use tracing::{debug, error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Resolve a domain's SPF record and everything it includes
///
/// Prints the resolved tree as JSON on stdout. Errors are printed as
/// `{"error": CODE, "message": MSG}` on stderr.
#[derive(Parser, Debug)]
#[command(name = "spftree")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Domain to resolve
    domain: String,

    /// Configuration file (TOML)
    #[arg(short, long, env = "SPFTREE_CONFIG")]
    config: Option<PathBuf>,

    /// Maximum include depth below the root
    #[arg(long)]
    max_depth: Option<usize>,

    /// Print JSON on a single line
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        if err.is_unexpected() {
            error!("spftree failed: {}", err);
        }
        let body = serde_json::json!({
            "error": err.code(),
            "message": err.to_string(),
        });
        eprintln!("{}", body);
        std::process::exit(err.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(max_depth) = cli.max_depth {
        config.resolver.max_depth = max_depth;
    }

    init_logging(&config.logging);
    debug!("Loaded configuration: {:?}", config);

    let service = SpfTreeService::from_settings(&config.resolver)?;
    let tree = service.get_spf_tree(&cli.domain).await?;

    let json = if cli.compact {
        serde_json::to_string(&tree)
    } else {
        serde_json::to_string_pretty(&tree)
    }
    .context("Failed to serialize SPF tree")?;

    println!("{}", json);
    Ok(())
}

/// Logs go to stderr; stdout carries only the JSON result
fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.format == "json" {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}
