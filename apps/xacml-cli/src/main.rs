//! # xacml-cli
//!
//! Command-line front end for the XACML decision engine.
//!
//! - `xacml evaluate`: answer a JSON request with a configured PDP
//! - `xacml check`: parse a policy document and print it re-encoded
//! - `xacml version-match`: test a policy version against reference constraints

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// XACML policy decision point.
#[derive(Parser)]
#[command(name = "xacml", version, about)]
struct Cli {
    /// Emit logs as JSON lines instead of text.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a JSON request and print the JSON response.
    Evaluate {
        /// PDP configuration file.
        #[arg(long)]
        config: PathBuf,
        /// Request document (reads stdin when omitted).
        #[arg(long)]
        request: Option<PathBuf>,
        /// PDP to use (defaults to the configured default).
        #[arg(long)]
        pdp: Option<String>,
    },
    /// Parse a policy document and print it re-encoded.
    Check {
        /// Policy or policy set XML file.
        policy: PathBuf,
        /// Spaces per indentation level.
        #[arg(long, default_value = "2")]
        indent: usize,
    },
    /// Check whether a version meets reference constraints.
    VersionMatch {
        /// Version to test, e.g. 1.2.3.
        version: String,
        /// Exact pattern, e.g. 1.*.
        #[arg(long)]
        exact: Option<String>,
        /// Lowest acceptable version pattern.
        #[arg(long)]
        earliest: Option<String>,
        /// Highest acceptable version pattern.
        #[arg(long)]
        latest: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so they don't interfere with responses on stdout.
    let filter = EnvFilter::from_default_env()
        .add_directive("xacml_policy=warn".parse()?)
        .add_directive("xacml_config=info".parse()?);
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .init();
    }

    match &cli.command {
        Commands::Evaluate {
            config,
            request,
            pdp,
        } => commands::evaluate::execute(config, request.as_deref(), pdp.as_deref()),
        Commands::Check { policy, indent } => commands::check::execute(policy, *indent),
        Commands::VersionMatch {
            version,
            exact,
            earliest,
            latest,
        } => commands::version::execute(
            version,
            exact.as_deref(),
            earliest.as_deref(),
            latest.as_deref(),
        ),
    }
}
