//! End-to-end runs over a scripted engine: intake, fan-out, per-host stage
//! loops and the shared findings registry.

use brrmap::coordinator::{Coordinator, CoordinatorConfig};
use brrmap::error::ExecError;
use brrmap::intake::read_hosts;
use brrmap::orchestrator::HostStatus;
use brrmap::output::{CaptureBuffer, OutputSink};
use brrmap::policy::{Stage, StopReason};
use brrmap::scanner::ScriptedExecutor;
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::BufReader;

const UP: &str = "Nmap scan report for target\nHost is up (0.0010s latency).\n";

fn engine() -> ScriptedExecutor {
    ScriptedExecutor::new(|args| {
        let host = args.last().map(String::as_str).unwrap_or_default();
        let has = |flag: &str| args.iter().any(|a| a == flag);

        match host {
            "broken.example" => Err(ExecError::NonZeroExit {
                status: "exit status: 1".to_string(),
                stderr: "Failed to resolve \"broken.example\".".to_string(),
            }),
            "down.example" => Ok("Note: Host seems down.\n".to_string()),
            "quiet.example" if has("-p-") => {
                Ok(format!("{UP}All 65535 scanned ports are closed\n"))
            }
            _ if has("-sn") => Ok(UP.to_string()),
            _ if has("-p-") => Ok(format!(
                "{UP}Not shown: 65533 closed tcp ports (conn-refused)\n\
                 PORT   STATE SERVICE\n22/tcp open  ssh\n80/tcp open  http\n"
            )),
            _ => Ok(format!(
                "{UP}PORT   STATE SERVICE VERSION\n22/tcp open  ssh     OpenSSH 9.6\n"
            )),
        }
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_every_host_reaches_an_outcome() {
    let dir = TempDir::new().unwrap();
    let input: &[u8] =
        b"web.example\nbroken.example\n\ndown.example\nQUIET.example\nweb.example\n";
    let engine = engine();
    let buffer = CaptureBuffer::new();

    let coordinator = Coordinator::new(
        CoordinatorConfig::new(dir.path()).with_max_workers(2),
        Arc::new(engine.clone()),
    )
    .with_sink(OutputSink::from_writer(buffer.clone()));

    let summary = coordinator.run(read_hosts(BufReader::new(input))).await;

    assert_eq!(summary.hosts(), 4);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.completed(), 3);

    let status = |name: &str| {
        summary
            .outcomes
            .iter()
            .find(|o| o.host.as_str() == name)
            .map(|o| o.status.clone())
            .unwrap()
    };
    assert_eq!(
        status("web.example"),
        HostStatus::Completed(StopReason::DeepAnalysisDone)
    );
    assert_eq!(
        status("down.example"),
        HostStatus::Completed(StopReason::Unreachable)
    );
    assert_eq!(
        status("quiet.example"),
        HostStatus::Completed(StopReason::NoOpenPorts)
    );
    assert!(matches!(status("broken.example"), HostStatus::Failed(_)));

    let web = summary
        .outcomes
        .iter()
        .find(|o| o.host.as_str() == "web.example")
        .unwrap();
    let stages: Vec<Stage> = web.history.iter().map(|t| t.task.stage()).collect();
    assert_eq!(stages, vec![Stage::Sweep, Stage::FullRange, Stage::Deeper]);

    let deeper = engine
        .calls()
        .into_iter()
        .find(|args| {
            args.last().map(String::as_str) == Some("web.example")
                && args.iter().any(|a| a == "-p22,80")
        });
    assert!(deeper.is_some());

    assert!(dir.path().join("web_example").is_dir());
    assert!(summary
        .findings
        .iter()
        .any(|f| f.host.as_str() == "web.example" && f.title == "Open Port 22/tcp"));

    let console = buffer.contents();
    assert!(console.contains("[ Stage 1 ] Host: web.example"));
    assert!(console.contains("[*] Scheduling deeper port analysis for host: web.example"));
}

#[tokio::test]
async fn test_empty_input_yields_empty_summary() {
    let dir = TempDir::new().unwrap();
    let input: &[u8] = b"\n\n";
    let engine = engine();

    let coordinator =
        Coordinator::new(CoordinatorConfig::new(dir.path()), Arc::new(engine.clone()));
    let summary = coordinator.run(read_hosts(BufReader::new(input))).await;

    assert_eq!(summary.hosts(), 0);
    assert!(summary.findings.is_empty());
    assert_eq!(engine.call_count(), 0);
}
