//! Host identifiers read from the intake stream.
//!
//! A `HostId` is always trimmed, lower-cased, free of whitespace and never
//! starts with `-`, so it can be passed straight to the scan engine and used
//! to derive an artifact namespace.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated, lower-cased host identifier (hostname, IP or CIDR string).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(String);

impl HostId {
    /// Parse a single intake line into a host identifier.
    pub fn parse(line: &str) -> Result<Self, HostError> {
        let host = line.trim().to_lowercase();

        if host.is_empty() {
            return Err(HostError::Empty);
        }

        // A leading dash would reach the engine as an option.
        if host.starts_with('-') || host.chars().any(char::is_whitespace) {
            return Err(HostError::Malformed(host));
        }

        Ok(Self(host))
    }

    /// The identifier as passed to the scan engine.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory-safe namespace for this host's artifacts.
    ///
    /// Every character that is not ASCII alphanumeric becomes `_`, so
    /// `10.0.0.1` maps to `10_0_0_1` and `scanme.nmap.org` to
    /// `scanme_nmap_org`.
    pub fn namespace(&self) -> String {
        self.0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for HostId {
    type Err = HostError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for HostId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error type for host line parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("empty host line")]
    Empty,
    #[error("malformed host line: {0:?}")]
    Malformed(String),
}
