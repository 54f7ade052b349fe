//! Scan tasks and engine command assembly.

use crate::policy::{NextScan, Stage, SWEEP_SWITCH};
use crate::types::HostId;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Engine flag that writes the normal-format report to a file.
pub const OUTPUT_FLAG: &str = "-oN";

/// Path of the raw report artifact for one stage of one host.
///
/// Layout is `{root}/{ns}/{ns}_{stage}_raw.txt` with `ns` the host's
/// sanitized namespace.
pub fn artifact_path(root: &Path, host: &HostId, stage: Stage) -> PathBuf {
    let namespace = host.namespace();
    root.join(&namespace)
        .join(format!("{}_{}_raw.txt", namespace, stage.name()))
}

/// One engine invocation for one host.
///
/// Tasks are built by the orchestrator from policy decisions and are never
/// modified after execution; [`ScanTask::complete`] yields the finished copy
/// that goes into history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanTask {
    host: HostId,
    ports: String,
    switches: String,
    ordinal: u32,
    stage: Stage,
    completed: bool,
    artifact: PathBuf,
}

impl ScanTask {
    /// The first task for a host: a discovery sweep with no port argument.
    pub fn sweep(host: HostId, artifact_root: &Path) -> Self {
        let artifact = artifact_path(artifact_root, &host, Stage::Sweep);
        Self {
            host,
            ports: String::new(),
            switches: SWEEP_SWITCH.to_string(),
            ordinal: 1,
            stage: Stage::Sweep,
            completed: false,
            artifact,
        }
    }

    /// The task that follows this one, one ordinal later.
    pub fn follow_up(&self, next: &NextScan, artifact_root: &Path) -> Self {
        Self {
            host: self.host.clone(),
            ports: next.ports.clone(),
            switches: next.switches.clone(),
            ordinal: self.ordinal + 1,
            stage: next.stage,
            completed: false,
            artifact: artifact_path(artifact_root, &self.host, next.stage),
        }
    }

    /// Mark the task executed.
    pub fn complete(self) -> Self {
        Self {
            completed: true,
            ..self
        }
    }

    pub fn host(&self) -> &HostId {
        &self.host
    }

    pub fn ports(&self) -> &str {
        &self.ports
    }

    pub fn switches(&self) -> &str {
        &self.switches
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    pub fn artifact(&self) -> &Path {
        &self.artifact
    }

    /// Assemble the engine's argument list.
    ///
    /// Order is ports, switches, output capture, host. Port and switch
    /// strings are split on whitespace so multi-token values become separate
    /// arguments and no empty argument is ever produced.
    pub fn command_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self
            .ports
            .split_whitespace()
            .chain(self.switches.split_whitespace())
            .map(str::to_string)
            .collect();

        args.push(OUTPUT_FLAG.to_string());
        args.push(self.artifact.to_string_lossy().into_owned());

        if !self.host.as_str().is_empty() {
            args.push(self.host.to_string());
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{decide, Decision};

    fn host() -> HostId {
        HostId::parse("Scanme.Nmap.org").unwrap()
    }

    #[test]
    fn test_artifact_path_layout() {
        let path = artifact_path(Path::new("loot"), &host(), Stage::Deeper);
        assert_eq!(
            path,
            Path::new("loot/scanme_nmap_org/scanme_nmap_org_deeper_raw.txt")
        );
    }

    #[test]
    fn test_sweep_task() {
        let task = ScanTask::sweep(host(), Path::new("."));
        assert_eq!(task.ordinal(), 1);
        assert_eq!(task.stage(), Stage::Sweep);
        assert_eq!(task.ports(), "");
        assert_eq!(task.switches(), "-sn");
        assert!(!task.is_completed());
        assert!(task
            .artifact()
            .ends_with("scanme_nmap_org/scanme_nmap_org_sweep_raw.txt"));
    }

    #[test]
    fn test_sweep_command_args() {
        let task = ScanTask::sweep(host(), Path::new("out"));
        assert_eq!(
            task.command_args(),
            vec![
                "-sn",
                "-oN",
                "out/scanme_nmap_org/scanme_nmap_org_sweep_raw.txt",
                "scanme.nmap.org",
            ]
        );
    }

    #[test]
    fn test_follow_up_increments_ordinal() {
        let root = Path::new("out");
        let sweep = ScanTask::sweep(host(), root);
        let Decision::Next(next) = decide(Stage::Sweep, "Host is up (0.1s latency).") else {
            panic!("expected follow-up");
        };
        let full = sweep.follow_up(&next, root);

        assert_eq!(full.ordinal(), 2);
        assert_eq!(full.stage(), Stage::FullRange);
        assert_eq!(full.host(), sweep.host());
        assert_eq!(
            full.command_args(),
            vec![
                "-p-",
                "-sT",
                "-oN",
                "out/scanme_nmap_org/scanme_nmap_org_fullrange_raw.txt",
                "scanme.nmap.org",
            ]
        );
    }

    #[test]
    fn test_empty_ports_emit_no_argument() {
        let root = Path::new("out");
        let sweep = ScanTask::sweep(host(), root);
        let Decision::Next(next) = decide(Stage::Sweep, "Host seems down.") else {
            panic!("expected follow-up");
        };
        let quick = sweep.follow_up(&next, root);
        let args = quick.command_args();

        assert_eq!(args[0], "-Pn");
        assert!(args.iter().all(|a| !a.is_empty()));
    }

    #[test]
    fn test_multi_token_ports_are_split() {
        let root = Path::new("out");
        let next = NextScan {
            stage: Stage::Udp,
            ports: "--top-ports 100".to_string(),
            switches: "-sU".to_string(),
        };
        let udp = ScanTask::sweep(host(), root).follow_up(&next, root);
        assert_eq!(&udp.command_args()[..3], &["--top-ports", "100", "-sU"]);
    }

    #[test]
    fn test_complete_keeps_fields() {
        let task = ScanTask::sweep(host(), Path::new("."));
        let done = task.clone().complete();
        assert!(done.is_completed());
        assert_eq!(done.ordinal(), task.ordinal());
        assert_eq!(done.command_args(), task.command_args());
    }
}
