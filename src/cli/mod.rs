//! CLI subcommand definitions and handlers.
//!
//! - `brrmap scan` - Scan hosts read from stdin or a file
//! - `brrmap config show|init` - Inspect or create the settings file
//!
//! With no subcommand, brrmap scans hosts from stdin.

mod config;
mod scan;

pub use config::ConfigCommand;
pub use scan::ScanCommand;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// brrmap - adaptive multi-stage nmap reconnaissance.
///
/// Each host starts with a ping sweep; every later stage is chosen from
/// what the previous one found.
#[derive(Parser, Debug)]
#[command(name = "brrmap")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Adaptive multi-stage nmap reconnaissance", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom settings file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan hosts read one per line
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Show or initialise settings
    #[command(alias = "c")]
    Config(ConfigCommand),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_no_subcommand() {
        let cli = Cli::try_parse_from(["brrmap", "-q"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.quiet);
    }

    #[test]
    fn test_scan_flags() {
        let cli = Cli::try_parse_from([
            "brrmap", "scan", "--input", "hosts.txt", "-w", "4", "--udp", "--timeout", "0",
        ])
        .unwrap();

        match cli.command {
            Some(Commands::Scan(scan)) => {
                assert_eq!(scan.input, Some(PathBuf::from("hosts.txt")));
                assert_eq!(scan.workers, Some(4));
                assert_eq!(scan.timeout, Some(0));
                assert!(scan.udp);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["brrmap", "-v", "-q"]).is_err());
    }
}
