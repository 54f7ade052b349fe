//! Scan engine adapter backed by an external `nmap` process.
//!
//! Each invocation runs in its own process group so a timeout or
//! cancellation can take down the engine together with anything it forked.

use crate::error::ExecError;
use crate::scanner::traits::{Cancellation, Executor};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

/// Default engine binary, looked up on `PATH`.
pub const DEFAULT_PROGRAM: &str = "nmap";

/// Runs the scan engine as a child process and captures its stdout.
#[derive(Debug, Clone)]
pub struct NmapExecutor {
    program: PathBuf,
    timeout: Option<Duration>,
}

impl NmapExecutor {
    /// Create an executor for the given engine binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            timeout: None,
        }
    }

    /// Bound every invocation; `None` waits indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl Default for NmapExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_PROGRAM)
    }
}

#[async_trait]
impl Executor for NmapExecutor {
    async fn execute(&self, args: &[String], cancel: &Cancellation) -> Result<String, ExecError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        isolate_process_group(&mut command);

        debug!(program = %self.program.display(), ?args, "launching scan engine");

        let child = command.spawn().map_err(|source| ExecError::Launch {
            program: self.program.display().to_string(),
            source,
        })?;
        let pid = child.id();

        let limit = self.timeout;
        let deadline = async move {
            match limit {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            result = child.wait_with_output() => {
                let output = result?;
                if !output.status.success() {
                    return Err(ExecError::NonZeroExit {
                        status: output.status.to_string(),
                        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                    });
                }
                Ok(String::from_utf8_lossy(&output.stdout).into_owned())
            }
            _ = deadline => {
                warn!(?pid, ?limit, "scan engine timed out, killing process group");
                kill_process_group(pid);
                Err(ExecError::Timeout(limit.unwrap_or_default()))
            }
            _ = cancel.cancelled() => {
                debug!(?pid, "scan cancelled, killing process group");
                kill_process_group(pid);
                Err(ExecError::Cancelled)
            }
        }
    }

    fn name(&self) -> &str {
        "nmap"
    }
}

#[cfg(unix)]
fn isolate_process_group(command: &mut Command) {
    command.process_group(0);
}

#[cfg(not(unix))]
fn isolate_process_group(_command: &mut Command) {}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };

    // SAFETY: killpg only delivers a signal. The group was created for this
    // child by `process_group(0)`, so its id equals the child's pid.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        debug!(pgid, error = %std::io::Error::last_os_error(), "killpg failed");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn shell(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_captures_stdout() {
        let engine = NmapExecutor::new("sh");
        let out = engine
            .execute(&shell("echo 'Host is up (0.01s latency).'"), &Cancellation::never())
            .await;
        let out = assert_ok!(out);
        assert!(out.contains("Host is up ("));
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_reported() {
        let engine = NmapExecutor::new("sh");
        let err = engine
            .execute(&shell("echo boom >&2; exit 3"), &Cancellation::never())
            .await
            .unwrap_err();
        match err {
            ExecError::NonZeroExit { stderr, .. } => assert_eq!(stderr, "boom"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_binary_is_launch_error() {
        let engine = NmapExecutor::new("/nonexistent/brrmap-test-engine");
        let result = engine.execute(&[], &Cancellation::never()).await;
        assert!(matches!(assert_err!(result), ExecError::Launch { .. }));
    }

    #[tokio::test]
    async fn test_timeout_kills_engine() {
        let engine = NmapExecutor::new("sh").with_timeout(Some(Duration::from_millis(50)));
        let started = std::time::Instant::now();
        let result = engine
            .execute(&shell("sleep 5"), &Cancellation::never())
            .await;
        assert!(matches!(result, Err(ExecError::Timeout(_))));
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_cancellation_stops_engine() {
        let engine = NmapExecutor::new("sh");
        let (handle, cancel) = Cancellation::pair();

        let task = tokio::spawn(async move { engine.execute(&shell("sleep 5"), &cancel).await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("cancelled invocation should return promptly")
            .unwrap();
        assert!(matches!(result, Err(ExecError::Cancelled)));
    }
}
