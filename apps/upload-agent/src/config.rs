//! Agent configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/drivestream/agent.toml`
//! - Windows: `%APPDATA%/drivestream/agent.toml`
//!
//! A path passed with `--config` takes precedence and must exist.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory uploads are written to (created on start).
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,

    /// Identity progress notifications are addressed to.
    #[serde(default = "default_subscriber")]
    pub subscriber: String,

    /// Minimum spacing between progress notifications of one file, in ms.
    #[serde(default = "default_message_delay_ms")]
    pub message_delay_ms: u64,

    /// Owner shown in the folder listing.
    #[serde(default = "default_owner")]
    pub owner: String,

    /// Maximum number of files per session (unlimited when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fields: Option<usize>,
}

fn default_upload_dir() -> String {
    drivestream_file_ops::DEFAULT_UPLOAD_DIR.into()
}

fn default_subscriber() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "drivestream".into())
}

fn default_message_delay_ms() -> u64 {
    200
}

fn default_owner() -> String {
    std::env::var("USER").unwrap_or_else(|_| "drivestream".into())
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            subscriber: default_subscriber(),
            message_delay_ms: default_message_delay_ms(),
            owner: default_owner(),
            max_fields: None,
        }
    }
}

impl Config {
    /// Loads configuration from `explicit`, or from the platform path.
    ///
    /// A missing platform file is created with defaults.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        if let Some(path) = explicit {
            return Self::read(path);
        }

        let path = config_path()?;
        if path.exists() {
            Self::read(&path)
        } else {
            let config = Config::default();
            config.save(&path)?;
            Ok(config)
        }
    }

    fn read(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "configuration read");
        Ok(config)
    }

    /// Saves the configuration to `path`.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn message_delay(&self) -> Duration {
        Duration::from_millis(self.message_delay_ms)
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("drivestream")
            .join("agent.toml"))
    }

    #[cfg(target_os = "windows")]
    {
        let appdata =
            std::env::var("APPDATA").unwrap_or_else(|_| "C:\\Users\\Default\\AppData".into());
        Ok(PathBuf::from(appdata).join("drivestream").join("agent.toml"))
    }

    #[cfg(not(any(target_os = "linux", target_os = "windows")))]
    {
        Ok(PathBuf::from("/tmp/drivestream/agent.toml"))
    }
}
