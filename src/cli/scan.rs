//! Scan subcommand implementation.
//!
//! Reads hosts from stdin or `--input`, drives every host through the
//! adaptive stage pipeline and prints a summary once all workers finish.

use crate::config::AppSettings;
use crate::coordinator::{Coordinator, CoordinatorConfig};
use crate::error::{CliError, CliResult};
use crate::intake::read_hosts;
use crate::output::{self, OutputSink};
use crate::policy::Policy;
use crate::scanner::{CancelHandle, Cancellation};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Scan hosts read one per line.
#[derive(Parser, Debug, Default)]
pub struct ScanCommand {
    /// Read hosts from a file instead of stdin
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// Maximum hosts scanned at once (0 = unbounded)
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Path to the nmap executable
    #[arg(long, value_name = "PATH")]
    pub nmap: Option<PathBuf>,

    /// Per-stage time limit in seconds (0 = none)
    #[arg(short, long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Root directory for per-host artifacts
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Probe the top UDP ports when no TCP port is open
    #[arg(long)]
    pub udp: bool,

    /// Console flush interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub flush_ms: Option<u64>,
}

impl ScanCommand {
    /// Apply command-line overrides on top of loaded settings.
    pub fn apply(&self, settings: &mut AppSettings) {
        if let Some(workers) = self.workers {
            settings.max_workers = workers;
        }
        if let Some(nmap) = &self.nmap {
            settings.nmap_path = nmap.clone();
        }
        if let Some(timeout) = self.timeout {
            settings.stage_timeout_secs = timeout;
        }
        if let Some(dir) = &self.output_dir {
            settings.output_dir = dir.clone();
        }
        if let Some(ms) = self.flush_ms {
            settings.flush_interval_ms = ms;
        }
        if self.udp {
            settings.udp_probe = true;
        }
    }

    /// Execute the scan command.
    pub async fn execute(&self, mut settings: AppSettings, quiet: bool) -> CliResult<()> {
        self.apply(&mut settings);
        settings.validate()?;

        if !quiet {
            output::print_banner();
        }

        let hosts = self.open_hosts().await?;

        let policy = if settings.udp_probe {
            Policy::new().with_udp_probe()
        } else {
            Policy::new()
        };
        let config = CoordinatorConfig::new(&settings.output_dir)
            .with_max_workers(settings.max_workers)
            .with_policy(policy);

        let (handle, cancel) = Cancellation::pair();
        spawn_interrupt_handler(handle);

        let sink = OutputSink::stdout();
        let flusher = sink.spawn_flusher(settings.flush_interval());

        info!(
            workers = settings.max_workers,
            nmap = %settings.nmap_path.display(),
            output_dir = %settings.output_dir.display(),
            "starting scan"
        );

        let coordinator = Coordinator::new(config, Arc::new(settings.executor()))
            .with_sink(sink)
            .with_cancellation(cancel.clone());
        let summary = coordinator.run(hosts).await;
        flusher.stop();

        if cancel.is_cancelled() {
            output::print_warning("scan interrupted; unfinished hosts were abandoned");
        }

        if !quiet {
            output::print_summary(&summary)?;
        }

        Ok(())
    }

    async fn open_hosts(&self) -> CliResult<mpsc::Receiver<crate::types::HostId>> {
        match &self.input {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|source| CliError::Input {
                        path: path.clone(),
                        source,
                    })?;
                Ok(read_hosts(BufReader::new(file)))
            }
            None => Ok(read_hosts(BufReader::new(tokio::io::stdin()))),
        }
    }
}

/// Cancel the run on the first Ctrl-C.
fn spawn_interrupt_handler(handle: CancelHandle) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling running scans");
                handle.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupts"),
        }
    });
}
