//! Fan-out over hosts.
//!
//! The coordinator starts one orchestrator per host received, runs them
//! concurrently under a bounded worker pool and gathers every outcome. One
//! host's failure, or even a panic in its worker, never affects the others.

use crate::error::ScanError;
use crate::loot::{Finding, LootRegistry};
use crate::orchestrator::{HostContext, HostOutcome, Orchestrator, SharedExecutor};
use crate::output::OutputSink;
use crate::policy::{Policy, Stage};
use crate::scanner::Cancellation;
use crate::types::{HostId, RunId};
use chrono::{DateTime, Utc};
use futures::FutureExt;
use std::any::Any;
use std::collections::{BTreeMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, instrument, warn};

/// Configuration for a coordinator run.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Maximum hosts scanned at once; 0 means unbounded.
    pub max_workers: usize,
    /// Root directory for per-host artifact directories.
    pub artifact_root: PathBuf,
    /// Transition policy shared by every host.
    pub policy: Policy,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            max_workers: 10,
            artifact_root: PathBuf::from("."),
            policy: Policy::default(),
        }
    }
}

impl CoordinatorConfig {
    pub fn new(artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            artifact_root: artifact_root.into(),
            ..Self::default()
        }
    }

    /// Set the worker pool size (0 for unbounded).
    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    fn permits(&self) -> usize {
        if self.max_workers == 0 {
            Semaphore::MAX_PERMITS
        } else {
            self.max_workers
        }
    }
}

/// Aggregated result of one run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// One outcome per distinct host, sorted by host.
    pub outcomes: Vec<HostOutcome>,
    pub findings: Vec<Finding>,
}

impl RunSummary {
    pub fn hosts(&self) -> usize {
        self.outcomes.len()
    }

    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    /// Total number of executed stages across all hosts.
    pub fn total_stages(&self) -> usize {
        self.outcomes.iter().map(HostOutcome::stages_completed).sum()
    }

    /// Executed stage count per stage kind.
    pub fn stage_counts(&self) -> BTreeMap<Stage, usize> {
        let mut counts = BTreeMap::new();
        for done in self.outcomes.iter().flat_map(|o| &o.history) {
            *counts.entry(done.task.stage()).or_insert(0) += 1;
        }
        counts
    }
}

/// Runs one orchestrator per host.
pub struct Coordinator {
    config: CoordinatorConfig,
    executor: SharedExecutor,
    sink: OutputSink,
    loot: LootRegistry,
    cancel: Cancellation,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig, executor: SharedExecutor) -> Self {
        Self {
            config,
            executor,
            sink: OutputSink::discard(),
            loot: LootRegistry::new(),
            cancel: Cancellation::never(),
        }
    }

    /// Send per-stage progress lines to `sink`.
    pub fn with_sink(mut self, sink: OutputSink) -> Self {
        self.sink = sink;
        self
    }

    /// Stop starting new stages once `cancel` fires.
    pub fn with_cancellation(mut self, cancel: Cancellation) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    pub fn loot(&self) -> &LootRegistry {
        &self.loot
    }

    fn host_context(&self) -> HostContext {
        HostContext {
            executor: Arc::clone(&self.executor),
            artifact_root: self.config.artifact_root.clone(),
            policy: self.config.policy,
            loot: self.loot.clone(),
            sink: self.sink.clone(),
            cancel: self.cancel.clone(),
        }
    }

    /// Scan every host received on `hosts` and wait for all of them.
    ///
    /// Hosts beyond the worker limit wait in the channel. A host whose
    /// artifact namespace was already taken is skipped. Cancellation stops
    /// intake even while the sender is still open.
    pub async fn run(&self, hosts: mpsc::Receiver<HostId>) -> RunSummary {
        let run_id = RunId::new();
        self.run_with_id(run_id, hosts).await
    }

    #[instrument(name = "run", skip(self, hosts), fields(run_id = %run_id.short()))]
    async fn run_with_id(&self, run_id: RunId, mut hosts: mpsc::Receiver<HostId>) -> RunSummary {
        let started_at = Utc::now();
        let clock = Instant::now();
        let semaphore = Arc::new(Semaphore::new(self.config.permits()));
        let mut workers: JoinSet<HostOutcome> = JoinSet::new();
        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();

        info!(
            max_workers = self.config.max_workers,
            root = %self.config.artifact_root.display(),
            "run started"
        );

        loop {
            let host = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    warn!("run cancelled, no further hosts accepted");
                    break;
                }
                next = hosts.recv() => match next {
                    Some(host) => host,
                    None => break,
                },
            };

            // Distinct hosts may sanitise to the same artifact namespace.
            if !seen.insert(host.namespace()) {
                warn!(%host, namespace = %host.namespace(), "duplicate host skipped");
                continue;
            }

            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            while let Some(joined) = workers.try_join_next() {
                collect(joined, &mut outcomes);
            }

            debug!(%host, active = workers.len() + 1, "starting host worker");
            let ctx = self.host_context();
            workers.spawn(async move {
                let outcome = run_host(host, ctx).await;
                drop(permit);
                outcome
            });
        }

        while let Some(joined) = workers.join_next().await {
            collect(joined, &mut outcomes);
        }
        self.sink.flush();

        outcomes.sort_by(|a, b| a.host.cmp(&b.host));
        let summary = RunSummary {
            run_id,
            started_at,
            duration: clock.elapsed(),
            outcomes,
            findings: self.loot.snapshot(),
        };

        info!(
            hosts = summary.hosts(),
            completed = summary.completed(),
            failed = summary.failed(),
            stages = summary.total_stages(),
            findings = summary.findings.len(),
            "run finished"
        );

        summary
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("executor", &self.executor.name())
            .finish_non_exhaustive()
    }
}

/// Run one host to completion, turning a panic into a failed outcome.
async fn run_host(host: HostId, ctx: HostContext) -> HostOutcome {
    let orchestrator = Orchestrator::start(host.clone(), ctx);

    match AssertUnwindSafe(orchestrator.run()).catch_unwind().await {
        Ok(outcome) => outcome,
        Err(panic) => {
            let error = ScanError::Panicked(panic_message(panic.as_ref()));
            error!(%host, %error, "host worker panicked");
            HostOutcome::failed(host, &error)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn collect(joined: Result<HostOutcome, JoinError>, outcomes: &mut Vec<HostOutcome>) {
    match joined {
        Ok(outcome) => outcomes.push(outcome),
        // Workers catch their own panics and are never aborted, so this only
        // fires if the runtime is shutting down.
        Err(e) => error!(error = %e, "host worker lost"),
    }
}
