//! Scripted scan engine for tests and dry runs.
//!
//! Answers each invocation from a closure over the argument list and records
//! every call, so orchestration can be exercised without a real engine.

use crate::error::ExecError;
use crate::scanner::traits::{Cancellation, Executor};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Script = dyn Fn(&[String]) -> Result<String, ExecError> + Send + Sync;

/// An engine whose reports come from a closure.
#[derive(Clone)]
pub struct ScriptedExecutor {
    script: Arc<Script>,
    delay: Option<Duration>,
    calls: Arc<Mutex<Vec<Vec<String>>>>,
}

impl ScriptedExecutor {
    /// Create an engine answering every call with `script(args)`.
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(&[String]) -> Result<String, ExecError> + Send + Sync + 'static,
    {
        Self {
            script: Arc::new(script),
            delay: None,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// An engine that returns the same report for every call.
    pub fn constant(report: impl Into<String>) -> Self {
        let report = report.into();
        Self::new(move |_| Ok(report.clone()))
    }

    /// Sleep before answering, to simulate slow scans.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every argument list received so far, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or_default()
    }
}

impl std::fmt::Debug for ScriptedExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedExecutor")
            .field("delay", &self.delay)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl Executor for ScriptedExecutor {
    async fn execute(&self, args: &[String], cancel: &Cancellation) -> Result<String, ExecError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(args.to_vec());
        }

        if let Some(delay) = self.delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(ExecError::Cancelled),
            }
        }

        (self.script)(args)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_calls() {
        let engine = ScriptedExecutor::constant("Host is up (0.01s latency).");
        let args = vec!["-sn".to_string(), "10.0.0.1".to_string()];

        let out = engine.execute(&args, &Cancellation::never()).await.unwrap();
        assert!(out.starts_with("Host is up"));
        assert_eq!(engine.calls(), vec![args]);
    }

    #[tokio::test]
    async fn test_script_sees_arguments() {
        let engine = ScriptedExecutor::new(|args| {
            if args.iter().any(|a| a == "-Pn") {
                Ok("Host is up (0.2s latency).".to_string())
            } else {
                Err(ExecError::NonZeroExit {
                    status: "exit status: 1".to_string(),
                    stderr: String::new(),
                })
            }
        });

        assert!(engine
            .execute(&["-Pn".to_string()], &Cancellation::never())
            .await
            .is_ok());
        assert!(engine
            .execute(&["-sn".to_string()], &Cancellation::never())
            .await
            .is_err());
        assert_eq!(engine.call_count(), 2);
    }
}
