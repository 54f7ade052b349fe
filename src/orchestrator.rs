//! Per-host scan state machine.
//!
//! An [`Orchestrator`] owns one host's progression from the initial sweep to
//! a terminal state. Stages run strictly one after another; each report is
//! handed to the transition policy, which either names the next stage or
//! ends the host.
//!
//! ```text
//! Created -> Running(Sweep) -> Running(next)* -> Terminal
//!                          \-> Failed
//! ```

use crate::error::{ExecError, ScanError, ScanResult};
use crate::loot::{extract_findings, LootRegistry};
use crate::output::OutputSink;
use crate::policy::{Decision, Policy, Stage, StopReason};
use crate::scanner::{Cancellation, Executor, ScanTask};
use crate::types::HostId;
use chrono::{DateTime, Utc};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Shared engine handle used by every worker.
pub type SharedExecutor = Arc<dyn Executor>;

/// Everything a host worker needs from the coordinator.
#[derive(Clone)]
pub struct HostContext {
    pub executor: SharedExecutor,
    pub artifact_root: PathBuf,
    pub policy: Policy,
    pub loot: LootRegistry,
    pub sink: OutputSink,
    pub cancel: Cancellation,
}

impl HostContext {
    /// Context with a fresh registry, a discarding sink and no cancellation.
    pub fn new(executor: SharedExecutor, artifact_root: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            artifact_root: artifact_root.into(),
            policy: Policy::default(),
            loot: LootRegistry::new(),
            sink: OutputSink::discard(),
            cancel: Cancellation::never(),
        }
    }
}

impl fmt::Debug for HostContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostContext")
            .field("executor", &self.executor.name())
            .field("artifact_root", &self.artifact_root)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Lifecycle state of one host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Created,
    Running(Stage),
    Terminal,
    Failed,
}

impl HostState {
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Terminal | Self::Failed)
    }
}

/// An executed task together with its report.
#[derive(Debug, Clone)]
pub struct CompletedTask {
    pub task: ScanTask,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub report: String,
}

/// How a host's orchestration ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostStatus {
    Completed(StopReason),
    Failed(String),
}

/// Final record of one host, returned to the coordinator.
#[derive(Debug, Clone)]
pub struct HostOutcome {
    pub host: HostId,
    pub status: HostStatus,
    pub history: Vec<CompletedTask>,
}

impl HostOutcome {
    /// Outcome for a worker that died before producing one.
    pub fn failed(host: HostId, error: &ScanError) -> Self {
        Self {
            host,
            status: HostStatus::Failed(error.to_string()),
            history: Vec::new(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, HostStatus::Failed(_))
    }

    pub fn stages_completed(&self) -> usize {
        self.history.len()
    }

    pub fn last_stage(&self) -> Option<Stage> {
        self.history.last().map(|done| done.task.stage())
    }

    pub fn failure(&self) -> Option<&str> {
        match &self.status {
            HostStatus::Failed(reason) => Some(reason),
            HostStatus::Completed(_) => None,
        }
    }
}

/// State machine driving one host through its stages.
pub struct Orchestrator {
    host: HostId,
    namespace: String,
    ctx: HostContext,
    state: HostState,
    current: Option<ScanTask>,
    pending: Option<ScanTask>,
    history: Vec<CompletedTask>,
}

impl Orchestrator {
    /// Create the orchestrator with its sweep task queued. Nothing runs yet.
    pub fn start(host: HostId, ctx: HostContext) -> Self {
        let namespace = host.namespace();
        let sweep = ScanTask::sweep(host.clone(), &ctx.artifact_root);

        Self {
            host,
            namespace,
            ctx,
            state: HostState::Running(Stage::Sweep),
            current: None,
            pending: Some(sweep),
            history: Vec::new(),
        }
    }

    pub fn host(&self) -> &HostId {
        &self.host
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Directory holding this host's artifacts.
    pub fn artifact_dir(&self) -> PathBuf {
        self.ctx.artifact_root.join(&self.namespace)
    }

    /// The task currently executing, if any.
    pub fn current(&self) -> Option<&ScanTask> {
        self.current.as_ref()
    }

    /// The next task to run, if any.
    pub fn pending(&self) -> Option<&ScanTask> {
        self.pending.as_ref()
    }

    /// Executed tasks in execution order.
    pub fn history(&self) -> &[CompletedTask] {
        &self.history
    }

    /// Run every stage until the host is terminal or failed.
    #[instrument(name = "host", skip(self), fields(host = %self.host))]
    pub async fn run(mut self) -> HostOutcome {
        let status = match self.drive().await {
            Ok(reason) => {
                self.state = HostState::Terminal;
                info!(%reason, stages = self.history.len(), "host complete");
                self.ctx
                    .sink
                    .line(format!("[ Done ] Host: {} ({})", self.host, reason));
                HostStatus::Completed(reason)
            }
            Err(e) => {
                self.state = HostState::Failed;
                warn!(error = %e, stages = self.history.len(), "host failed");
                self.ctx
                    .sink
                    .line(format!("[ Failed ] Host: {} ({})", self.host, e));
                HostStatus::Failed(e.to_string())
            }
        };

        self.current = None;
        self.pending = None;

        HostOutcome {
            host: self.host,
            status,
            history: self.history,
        }
    }

    async fn drive(&mut self) -> ScanResult<StopReason> {
        if self.ctx.cancel.is_cancelled() {
            return Err(ScanError::Cancelled(1));
        }
        self.prepare_artifact_dir().await?;

        while let Some(task) = self.pending.take() {
            if self.ctx.cancel.is_cancelled() {
                return Err(ScanError::Cancelled(task.ordinal()));
            }

            if let Decision::Stop(reason) = self.execute(task).await? {
                return Ok(reason);
            }
        }

        Ok(StopReason::Terminal)
    }

    /// Execute one task, record it and queue its follow-up.
    async fn execute(&mut self, task: ScanTask) -> ScanResult<Decision> {
        let ordinal = task.ordinal();
        self.state = HostState::Running(task.stage());

        info!(
            stage = %task.stage(),
            ordinal,
            ports = task.ports(),
            switches = task.switches(),
            "starting stage"
        );
        self.ctx.sink.line(format!(
            "[ Stage {} ] Host: {} Ports: {} Args: {}",
            ordinal,
            self.host,
            task.ports(),
            task.switches()
        ));

        let args = task.command_args();
        let started_at = Utc::now();
        self.current = Some(task.clone());
        let result = self.ctx.executor.execute(&args, &self.ctx.cancel).await;
        self.current = None;

        let report = match result {
            Ok(report) => report,
            Err(ExecError::Cancelled) => return Err(ScanError::Cancelled(ordinal)),
            Err(source) => return Err(ScanError::Invocation { ordinal, source }),
        };

        let task = task.complete();
        let decision = self.ctx.policy.evaluate(&task, &report);
        let new_findings = self
            .ctx
            .loot
            .record_all(extract_findings(&self.host, &report));
        debug!(ordinal, new_findings, ?decision, "stage evaluated");

        if let Decision::Next(next) = &decision {
            if next.stage == Stage::Deeper {
                self.ctx.sink.line(format!(
                    "[*] Scheduling deeper port analysis for host: {} ({})",
                    self.host, next.ports
                ));
            }
            self.pending = Some(task.follow_up(next, &self.ctx.artifact_root));
        }

        self.history.push(CompletedTask {
            task,
            started_at,
            finished_at: Utc::now(),
            report,
        });

        Ok(decision)
    }

    async fn prepare_artifact_dir(&self) -> ScanResult<()> {
        let dir = self.artifact_dir();
        create_dir(&dir).await
    }
}

async fn create_dir(dir: &Path) -> ScanResult<()> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| ScanError::ArtifactWrite {
            path: dir.to_path_buf(),
            source,
        })
}

impl fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Orchestrator")
            .field("host", &self.host)
            .field("state", &self.state)
            .field("pending", &self.pending.as_ref().map(ScanTask::stage))
            .field("history", &self.history.len())
            .finish()
    }
}
