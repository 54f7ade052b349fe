//! Host intake from a line-oriented source.
//!
//! Lines are lower-cased host identifiers; blank, malformed or option-like
//! lines are skipped without creating a worker.

use crate::types::HostId;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Capacity of the intake channel. Readers wait when workers lag behind.
pub const INTAKE_BUFFER: usize = 64;

/// Spawn a task that reads host lines from `reader` into a channel.
///
/// The channel closes when the reader reaches EOF, fails, or the receiver
/// is dropped.
pub fn read_hosts<R>(reader: R) -> mpsc::Receiver<HostId>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(INTAKE_BUFFER);

    tokio::spawn(async move {
        let mut lines = reader.lines();
        let mut line_no = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "host intake read failed");
                    break;
                }
            };
            line_no += 1;

            let host = match HostId::parse(&line) {
                Ok(host) => host,
                Err(e) => {
                    debug!(line = line_no, error = %e, "skipping host line");
                    continue;
                }
            };

            if tx.send(host).await.is_err() {
                break;
            }
        }

        debug!(lines = line_no, "host intake finished");
    });

    rx
}
