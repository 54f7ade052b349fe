//! brrmap - adaptive multi-stage nmap reconnaissance.

use anyhow::{Context, Result};
use brrmap::cli::{Cli, Commands, ScanCommand};
use brrmap::config::AppSettings;
use brrmap::output;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays reserved for scan progress.
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if verbose {
        "brrmap=debug"
    } else if quiet {
        "brrmap=warn"
    } else {
        "brrmap=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => AppSettings::load_from(path)
            .with_context(|| format!("loading settings from {}", path.display()))?,
        None => AppSettings::load().context("loading settings")?,
    };

    match cli.command {
        Some(Commands::Scan(cmd)) => cmd.execute(settings, cli.quiet).await?,
        Some(Commands::Config(cmd)) => cmd.execute(&settings)?,
        None => ScanCommand::default().execute(settings, cli.quiet).await?,
    }

    Ok(())
}
