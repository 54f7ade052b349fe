//! Application settings and paths.
//!
//! Settings live in a JSON file under the XDG config directory. Every field
//! has a default, so a partial file is valid.

use crate::error::{ConfigError, ConfigResult};
use crate::output::DEFAULT_FLUSH_INTERVAL;
use crate::scanner::NmapExecutor;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

static PATHS: OnceLock<Paths> = OnceLock::new();

/// Application directory paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/brrmap)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Get the global paths instance, resolving it on first use.
    pub fn get() -> ConfigResult<&'static Paths> {
        if let Some(paths) = PATHS.get() {
            return Ok(paths);
        }
        let paths = Self::new()?;
        Ok(PATHS.get_or_init(|| paths))
    }

    fn new() -> ConfigResult<Self> {
        let project =
            ProjectDirs::from("com", "brrmap", "brrmap").ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Worker pool size, 0 for unbounded.
    pub max_workers: usize,
    /// Scan engine executable.
    pub nmap_path: PathBuf,
    /// Per-invocation time limit in seconds, 0 for none.
    pub stage_timeout_secs: u64,
    /// Root directory for per-host artifact directories.
    pub output_dir: PathBuf,
    /// Console flush interval in milliseconds.
    pub flush_interval_ms: u64,
    /// Follow an empty full-range sweep with a UDP probe.
    pub udp_probe: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_workers: 10,
            nmap_path: PathBuf::from(crate::scanner::nmap::DEFAULT_PROGRAM),
            stage_timeout_secs: 1800,
            output_dir: PathBuf::from("."),
            flush_interval_ms: DEFAULT_FLUSH_INTERVAL.as_millis() as u64,
            udp_probe: false,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, falling back to defaults
    /// when no file exists yet.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::get()?.settings_file();

        if !file.exists() {
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self = serde_json::from_str(&content)
            .map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default location.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let paths = Paths::get()?;
        fs::create_dir_all(&paths.config_dir)?;
        let file = paths.settings_file();
        self.save_to(&file)?;
        Ok(file)
    }

    /// Save settings to a specific file.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.nmap_path.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue(
                "nmap_path must not be empty".to_string(),
            ));
        }
        if self.flush_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "flush_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Per-invocation time limit, if any.
    pub fn stage_timeout(&self) -> Option<Duration> {
        (self.stage_timeout_secs > 0).then(|| Duration::from_secs(self.stage_timeout_secs))
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Build the engine adapter these settings describe.
    pub fn executor(&self) -> NmapExecutor {
        NmapExecutor::new(&self.nmap_path).with_timeout(self.stage_timeout())
    }
}
