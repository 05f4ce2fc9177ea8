//! kvvs CLI - versioned blobs with branches, tags and retention.

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    output::set_quiet(cli.quiet);
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Init { force } => commands::init::run(&cli.config, force),
        Commands::Completions { shell } => commands::completions::run(shell),
        command => commands::run(&cli.config, command).await,
    };

    if let Err(e) = result {
        output::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

/// Log to stderr; `RUST_LOG` wins over the verbosity flag.
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
