//! Error types for brrmap.
//!
//! Uses `thiserror` for ergonomic error definitions. Per-host failures
//! (`ScanError`, `ExecError`) are values handed back to the coordinator and
//! never abort the whole run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by the scan engine adapter for a single invocation.
#[derive(Error, Debug)]
pub enum ExecError {
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scan engine exited with {status}: {stderr}")]
    NonZeroExit { status: String, stderr: String },

    #[error("scan engine timed out after {0:?}")]
    Timeout(Duration),

    #[error("scan engine invocation cancelled")]
    Cancelled,

    #[error("IO error while collecting engine output: {0}")]
    Io(#[from] std::io::Error),
}

/// Error that ends one host's orchestration in the `Failed` state.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("stage {ordinal} invocation failed: {source}")]
    Invocation {
        ordinal: u32,
        #[source]
        source: ExecError,
    },

    #[error("cannot write artifacts under {path}: {source}")]
    ArtifactWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("run cancelled before stage {0}")]
    Cancelled(u32),

    #[error("host worker panicked: {0}")]
    Panicked(String),
}

/// Result type alias for per-host operations.
pub type ScanResult<T> = Result<T, ScanError>;

/// Configuration loading and saving errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings format: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors surfaced by CLI command handlers.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open host list {path}: {source}")]
    Input {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for CLI handlers.
pub type CliResult<T> = Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invocation_error_display_carries_stage() {
        let err = ScanError::Invocation {
            ordinal: 3,
            source: ExecError::NonZeroExit {
                status: "exit status: 1".to_string(),
                stderr: "Failed to resolve".to_string(),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("stage 3"));
        assert!(msg.contains("exit status: 1"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ExecError::Timeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "scan engine timed out after 5s");
    }
}
