//! Core type definitions using newtype patterns for type safety.
//!
//! These types keep host identifiers and port numbers validated from the
//! moment they enter the system.

mod host;
mod port;
mod run_id;

pub use host::{HostError, HostId};
pub use port::{Port, PortError, PortList};
pub use run_id::{RunId, RunIdError};
