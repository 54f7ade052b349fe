//! Output module.
//!
//! The buffered progress sink used while hosts are being scanned, and the
//! plain-text banner and summary printed around a run.

mod plain;
mod sink;

pub use plain::{
    print_banner, print_error, print_success, print_summary, print_warning, write_summary,
};
pub use sink::{CaptureBuffer, Flusher, OutputSink, DEFAULT_FLUSH_INTERVAL};
