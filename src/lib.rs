//! # brrmap - Adaptive Multi-Stage Reconnaissance
//!
//! brrmap drives nmap through a short pipeline per host. Each stage's text
//! report decides the next stage: a ping sweep (`-sn`), a `-Pn` recheck
//! when the sweep saw no host, a full-range connect scan (`-p- -sT`), and
//! finally a connect scan restricted to the ports found open.
//!
//! ## Example Usage
//!
//! ```rust,ignore
//! use brrmap::coordinator::{Coordinator, CoordinatorConfig};
//! use brrmap::intake::read_hosts;
//! use brrmap::scanner::NmapExecutor;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let hosts = read_hosts(tokio::io::BufReader::new(tokio::io::stdin()));
//!     let coordinator = Coordinator::new(
//!         CoordinatorConfig::new("./loot").with_max_workers(4),
//!         Arc::new(NmapExecutor::default()),
//!     );
//!     let summary = coordinator.run(hosts).await;
//!     println!("{} hosts, {} failed", summary.hosts(), summary.failed());
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`policy`] - Stage transition rules over report text
//! - [`scanner`] - Scan tasks, command assembly and the engine adapter
//! - [`orchestrator`] - Per-host stage loop
//! - [`coordinator`] - Bounded fan-out across hosts
//! - [`intake`] - Line-oriented host input
//! - [`loot`] - Findings shared across workers
//! - [`config`] - Settings file
//! - [`output`] - Console sink and summary printing
//! - [`error`] - Error types

pub mod cli;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod intake;
pub mod loot;
pub mod orchestrator;
pub mod output;
pub mod policy;
pub mod scanner;
pub mod types;

// Re-export commonly used types
pub use coordinator::{Coordinator, CoordinatorConfig, RunSummary};
pub use error::{CliError, ExecError, ScanError};
pub use orchestrator::{HostOutcome, HostStatus, Orchestrator};
pub use policy::{Decision, Policy, Stage, StopReason};
pub use scanner::{Executor, NmapExecutor, ScanTask};
pub use types::{HostId, Port, PortList};
