//! Scan engine abstraction.
//!
//! Defines the interface the orchestrator drives, enabling the real engine
//! process to be swapped for a scripted one in tests.

use crate::error::ExecError;
use async_trait::async_trait;
use tokio::sync::watch;

/// Receiving side of a run-wide cancellation signal.
///
/// Cheap to clone; every host worker holds its own copy.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
}

/// Sending side of the cancellation signal.
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl Cancellation {
    /// Create a linked handle and signal pair.
    pub fn pair() -> (CancelHandle, Self) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, Self { rx })
    }

    /// A signal that never fires.
    pub fn never() -> Self {
        let (tx, rx) = watch::channel(false);
        // Dropping the sender keeps the value false forever.
        drop(tx);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once cancellation is requested.
    ///
    /// Pends forever if the handle is dropped without cancelling.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl CancelHandle {
    /// Request cancellation of every linked signal.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// The external scan engine.
///
/// # Example
///
/// ```ignore
/// use brrmap::scanner::{Cancellation, Executor};
///
/// async fn run<E: Executor>(engine: &E, args: &[String]) -> String {
///     engine.execute(args, &Cancellation::never()).await.unwrap_or_default()
/// }
/// ```
#[async_trait]
pub trait Executor: Send + Sync {
    /// Run the engine with the given argument list and return its complete
    /// textual report.
    ///
    /// Failure to launch, a non-zero exit, a timeout or cancellation are all
    /// reported as [`ExecError`] values scoped to this invocation.
    async fn execute(&self, args: &[String], cancel: &Cancellation) -> Result<String, ExecError>;

    /// Short name for progress output.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancellation_fires() {
        let (handle, cancel) = Cancellation::pair();
        assert!(!cancel.is_cancelled());

        let waiter = {
            let cancel = cancel.clone();
            tokio::spawn(async move { cancel.cancelled().await })
        };
        handle.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("cancellation should resolve")
            .unwrap();
        assert!(cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_never_does_not_fire() {
        let cancel = Cancellation::never();
        assert!(!cancel.is_cancelled());
        let result = tokio::time::timeout(Duration::from_millis(20), cancel.cancelled()).await;
        assert!(result.is_err());
    }
}
