//! Configuration management for brrmap.
//!
//! Provides XDG-compliant storage for application settings.

mod settings;

pub use settings::{AppSettings, Paths};
