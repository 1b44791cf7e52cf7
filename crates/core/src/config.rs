//! Runtime configuration for the synchronisation layer.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! `DUTSYNC_*` environment variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ::config::{Config, Environment, File, FileFormat};
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

/// Directory under the user's config dir holding our files.
pub const CONFIG_DIR: &str = "dutsync";
/// Default cache lifetime for fetched resources, in seconds.
pub const DEFAULT_TTL_SECS: u64 = 600;
/// Default capacity of the event channel.
pub const DEFAULT_EVENT_BUFFER: usize = 32;

const DEFAULT_CONFIG_TOML: &str = r#"# dutsync configuration

# Seconds before a fetched resource (and a session token) is considered stale.
ttl_secs = 600

# Capacity of the completion event channel.
event_buffer = 32
"#;

/// Settings shared by every coordinator built from this configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Time-to-live of cached resources and of a session token.
    pub ttl: Duration,
    /// Capacity used when the caller asks us to build the event channel.
    pub event_buffer: usize,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    ttl_secs: u64,
    event_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_TTL_SECS),
            event_buffer: DEFAULT_EVENT_BUFFER,
        }
    }
}

impl SyncConfig {
    /// Load from the default location (`~/.config/dutsync/config.toml`).
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from an explicit file path. A missing file is not an error.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings = Config::builder()
            .set_default("ttl_secs", DEFAULT_TTL_SECS as i64)?
            .set_default("event_buffer", DEFAULT_EVENT_BUFFER as i64)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix("DUTSYNC").try_parsing(true))
            .build()
            .with_context(|| format!("failed to read configuration {}", path.display()))?;

        let raw: RawConfig = settings
            .try_deserialize()
            .context("failed to parse configuration")?;
        Ok(raw.into())
    }

    /// TTL in milliseconds, the unit resource timestamps are stored in.
    pub fn ttl_millis(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }
}

impl From<RawConfig> for SyncConfig {
    fn from(raw: RawConfig) -> Self {
        Self {
            ttl: Duration::from_secs(raw.ttl_secs),
            event_buffer: raw.event_buffer.max(1),
        }
    }
}

/// Location of the configuration file under the user's config directory.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join("config.toml")
}

/// Write the default configuration file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = default_config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("failed to write {}", path.display()))?;
    info!("wrote default configuration to {}", path.display());
    Ok(())
}
