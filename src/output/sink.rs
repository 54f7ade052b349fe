//! Buffered console sink shared by all host workers.
//!
//! Workers append lines concurrently; the sink's own mutex serialises them.
//! A single background task flushes the buffer on a fixed interval.

use std::fmt;
use std::io::{self, BufWriter, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default flush interval for the background flusher.
pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_millis(500);

type Writer = BufWriter<Box<dyn Write + Send>>;

/// Cloneable handle to a buffered line writer.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Writer>>,
}

impl OutputSink {
    /// Sink writing to standard output.
    pub fn stdout() -> Self {
        Self::from_writer(io::stdout())
    }

    /// Sink that drops everything.
    pub fn discard() -> Self {
        Self::from_writer(io::sink())
    }

    pub fn from_writer(writer: impl Write + Send + 'static) -> Self {
        let boxed: Box<dyn Write + Send> = Box::new(writer);
        Self {
            inner: Arc::new(Mutex::new(BufWriter::new(boxed))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Writer> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Append one line. Write errors are logged and otherwise ignored.
    pub fn line(&self, msg: impl AsRef<str>) {
        if let Err(e) = writeln!(self.lock(), "{}", msg.as_ref()) {
            debug!(error = %e, "output sink write failed");
        }
    }

    pub fn flush(&self) {
        if let Err(e) = self.lock().flush() {
            debug!(error = %e, "output sink flush failed");
        }
    }

    /// Start the periodic flusher on the current tokio runtime.
    pub fn spawn_flusher(&self, interval: Duration) -> Flusher {
        let sink = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                sink.flush();
            }
        });

        Flusher {
            sink: self.clone(),
            handle,
        }
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Handle to the background flush task.
#[derive(Debug)]
pub struct Flusher {
    sink: OutputSink,
    handle: JoinHandle<()>,
}

impl Flusher {
    /// Stop the background task and flush whatever is still buffered.
    pub fn stop(self) {
        self.handle.abort();
        self.sink.flush();
    }
}

/// In-memory writer whose contents can be read back, for tests.
#[derive(Debug, Clone, Default)]
pub struct CaptureBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        self.bytes
            .lock()
            .map(|b| String::from_utf8_lossy(&b).into_owned())
            .unwrap_or_default()
    }
}

impl Write for CaptureBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "capture buffer poisoned"))?
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
