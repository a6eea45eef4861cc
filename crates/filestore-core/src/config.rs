//! Store configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/filestore/config.toml)
//! 3. Environment variables (FILESTORE_* prefix)
//!
//! Environment variables take precedence over config file values.
//!
//! File name mappings are code-only: they are never read from or written to
//! the config file and can only be changed through [`ConfigUpdate`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::encoding::Encoding;
use crate::mapper::{self, NameMapping};

/// Environment variable prefix
const ENV_PREFIX: &str = "FILESTORE";

/// Name of the default storage directory
pub const DEFAULT_STORE_DIR: &str = "persistStore";

/// Store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one file per key
    #[serde(default = "default_storage_path")]
    pub storage_path: PathBuf,

    /// Codec between values and file contents
    #[serde(default)]
    pub encoding: Encoding,

    /// Upper bound for each filesystem call, in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Key → file name mapping
    #[serde(skip, default = "NameMapping::default_to_file_name")]
    pub to_file_name: NameMapping,

    /// File name → key mapping
    #[serde(skip, default = "NameMapping::default_from_file_name")]
    pub from_file_name: NameMapping,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            encoding: Encoding::default(),
            timeout_ms: None,
            to_file_name: NameMapping::default_to_file_name(),
            from_file_name: NameMapping::default_from_file_name(),
        }
    }
}

impl Config {
    /// Default configuration rooted at `storage_path`
    pub fn with_storage_path(storage_path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: storage_path.into(),
            ..Self::default()
        }
    }

    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (FILESTORE_STORAGE_PATH, FILESTORE_ENCODING, FILESTORE_TIMEOUT_MS)
    /// 2. Config file (~/.config/filestore/config.toml or FILESTORE_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load configuration, preferring an explicit config file path
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load only what the config file holds, without environment overrides
    ///
    /// Use this before [`Config::save_to_path`] so overrides are not
    /// persisted. If the file doesn't exist, defaults are used.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // FILESTORE_STORAGE_PATH
        if let Ok(val) = std::env::var(format!("{}_STORAGE_PATH", ENV_PREFIX)) {
            if !val.is_empty() {
                self.storage_path = PathBuf::from(val);
            }
        }

        // FILESTORE_ENCODING
        if let Ok(val) = std::env::var(format!("{}_ENCODING", ENV_PREFIX)) {
            match val.parse() {
                Ok(encoding) => self.encoding = encoding,
                Err(e) => warn!("Ignoring {}_ENCODING: {}", ENV_PREFIX, e),
            }
        }

        // FILESTORE_TIMEOUT_MS
        if let Ok(val) = std::env::var(format!("{}_TIMEOUT_MS", ENV_PREFIX)) {
            if val.is_empty() {
                self.timeout_ms = None;
            } else {
                match val.parse() {
                    Ok(ms) => self.timeout_ms = Some(ms),
                    Err(e) => warn!("Ignoring {}_TIMEOUT_MS: {}", ENV_PREFIX, e),
                }
            }
        }
    }

    /// Save configuration to the default config file
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with FILESTORE_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("filestore")
            .join("config.toml")
    }

    /// Per-call filesystem timeout, if any
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }

    /// Path of the file backing `key`
    pub fn path_for_key(&self, key: &str) -> PathBuf {
        mapper::path_for_key(&self.storage_path, &self.to_file_name, key)
    }

    /// Merge a partial update into this configuration
    ///
    /// Returns `true` when the storage root changed. An empty storage path
    /// is ignored.
    pub fn apply(&mut self, update: ConfigUpdate) -> bool {
        let mut root_changed = false;

        if let Some(path) = update.storage_path {
            if !path.as_os_str().is_empty() && path != self.storage_path {
                self.storage_path = path;
                root_changed = true;
            }
        }
        if let Some(encoding) = update.encoding {
            self.encoding = encoding;
        }
        if let Some(timeout) = update.timeout {
            self.timeout_ms = timeout.map(timeout_to_millis);
        }
        if let Some(mapping) = update.to_file_name {
            self.to_file_name = mapping;
        }
        if let Some(mapping) = update.from_file_name {
            self.from_file_name = mapping;
        }

        root_changed
    }
}

/// Partial configuration; unset fields keep their current value
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub storage_path: Option<PathBuf>,
    pub encoding: Option<Encoding>,
    pub timeout: Option<Option<Duration>>,
    pub to_file_name: Option<NameMapping>,
    pub from_file_name: Option<NameMapping>,
}

impl ConfigUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to another storage root
    pub fn storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    pub fn encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    /// Set or clear the per-call timeout
    pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn to_file_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.to_file_name = Some(NameMapping::new(f));
        self
    }

    pub fn from_file_name<F>(mut self, f: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.from_file_name = Some(NameMapping::new(f));
        self
    }
}

/// Whole milliseconds for a timeout, rounding a non-zero sub-millisecond
/// duration up so it does not become an immediate timeout
fn timeout_to_millis(timeout: Duration) -> u64 {
    let ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    if ms == 0 && !timeout.is_zero() {
        1
    } else {
        ms
    }
}

/// Get the default storage directory
fn default_storage_path() -> PathBuf {
    dirs::document_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STORE_DIR)
}
