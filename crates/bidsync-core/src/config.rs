//! Configuration types for bidsync components.
//!
//! Defaults are overridden by an optional TOML file
//! (`~/.config/bidsync/bidsync.toml`), which in turn is overridden by CLI
//! arguments and environment variables in the binary.
//!
//! ```toml
//! interval_minutes = 10
//! run_on_start = true
//! default_role = "Member"
//! max_connections = 5
//! retry_delays_secs = [1, 2, 3]
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;
use crate::retry::RetryPolicy;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "bidsync.toml";

/// Database connection pool configuration, applied to both stores.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { max_connections: 5 }
    }
}

/// Batch scheduling and engine configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Time between batch starts.
    pub interval: Duration,
    /// Run a batch immediately at startup instead of waiting one interval.
    pub run_on_start: bool,
    /// Backoff schedule for transient destination-insert faults.
    pub retry: RetryPolicy,
    /// Role assigned to newly provisioned contact logins.
    pub default_role: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5 * 60),
            run_on_start: true,
            retry: RetryPolicy::default(),
            default_role: "Member".to_string(),
        }
    }
}

/// Overrides read from the TOML configuration file. Every key is optional.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub interval_minutes: Option<u64>,
    pub run_on_start: Option<bool>,
    pub default_role: Option<String>,
    pub max_connections: Option<u32>,
    pub retry_delays_secs: Option<Vec<u64>>,
}

impl FileConfig {
    /// Applies the file's overrides onto engine and pool defaults.
    pub fn apply(&self, sync: &mut SyncConfig, db: &mut DbConfig) {
        if let Some(minutes) = self.interval_minutes {
            sync.interval = Duration::from_secs(minutes.max(1) * 60);
        }
        if let Some(run_on_start) = self.run_on_start {
            sync.run_on_start = run_on_start;
        }
        if let Some(role) = &self.default_role {
            sync.default_role = role.clone();
        }
        if let Some(delays) = &self.retry_delays_secs {
            sync.retry = RetryPolicy {
                delays: delays.iter().map(|s| Duration::from_secs(*s)).collect(),
            };
        }
        if let Some(max) = self.max_connections {
            db.max_connections = max;
        }
    }
}

/// `~/.config/bidsync/bidsync.toml`, when a config directory exists.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("bidsync").join(CONFIG_FILE_NAME))
}

/// Loads the configuration file.
///
/// A missing file yields the empty configuration; a malformed one is an error.
pub fn load_file_config(path: &Path) -> Result<FileConfig, AppError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => {
            return Err(AppError::ConfigError(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };

    toml::from_str(&content)
        .map_err(|e| AppError::ConfigError(format!("invalid {}: {}", path.display(), e)))
}
