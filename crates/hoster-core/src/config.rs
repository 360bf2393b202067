// ABOUTME: Configuration for the hoster supervisor.
// ABOUTME: Loaded from TOML with every field defaulted; a missing file means defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Directory containing the worker artifacts (e.g., "~/bots")
    pub worker_directory: String,

    /// Artifact extension without the dot. Empty means artifacts have no extension.
    pub extension: String,

    /// Program used to run an artifact (`<interpreter> <artifact>`).
    /// Empty means the artifact is executed directly.
    pub interpreter: String,

    /// Seconds between reaper passes
    pub reap_interval_secs: u64,

    /// Seconds to wait after a graceful stop request before killing.
    /// Zero waits without bound.
    pub stop_grace_secs: u64,

    /// Maximum bytes retained per captured output stream
    pub capture_limit_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_directory: ".".to_string(),
            extension: "py".to_string(),
            interpreter: "python3".to_string(),
            reap_interval_secs: 5,
            stop_grace_secs: 10,
            capture_limit_bytes: 1024 * 1024,
        }
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;
        Ok(config)
    }

    /// Load config from a TOML file, or return defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Get the default config file path (~/.config/hoster/hoster.toml)
    pub fn default_path() -> PathBuf {
        std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("."))
            })
            .join("hoster")
            .join("hoster.toml")
    }

    /// Expand ~ in the worker directory path
    pub fn worker_directory_expanded(&self) -> PathBuf {
        shellexpand::tilde(&self.worker_directory)
            .into_owned()
            .into()
    }

    /// Reaper polling interval, never shorter than one second
    pub fn reap_interval(&self) -> Duration {
        Duration::from_secs(self.reap_interval_secs.max(1))
    }

    /// Grace period before a stop escalates to a kill; None waits forever
    pub fn stop_grace(&self) -> Option<Duration> {
        (self.stop_grace_secs > 0).then(|| Duration::from_secs(self.stop_grace_secs))
    }
}
