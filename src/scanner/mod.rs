//! Scanner module - scan tasks and the external engine adapter.
//!
//! A [`ScanTask`] describes one engine invocation for one host; an
//! [`Executor`] turns its argument list into the engine's textual report.

pub mod mock;
pub mod nmap;
pub mod task;
pub mod traits;

pub use mock::ScriptedExecutor;
pub use nmap::NmapExecutor;
pub use task::{artifact_path, ScanTask, OUTPUT_FLAG};
pub use traits::{CancelHandle, Cancellation, Executor};
