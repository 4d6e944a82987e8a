//! TOML-based configuration persistence for the hotkey daemon.
//!
//! Reads and writes `AppConfig` to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\Hotkeyd\config.toml`
//! - Linux:    `$XDG_CONFIG_HOME/hotkeyd/config.toml` or `~/.config/hotkeyd/config.toml`
//! - macOS:    `~/Library/Application Support/Hotkeyd/config.toml`
//!
//! A different file can be chosen with `--config <path>`; the `*_at`
//! functions take an explicit path for that case.
//!
//! # Example
//!
//! ```toml
//! [engine]
//! monitor_interval_ms = 3000
//! idle_reset_secs = 30
//! duplicate_policy = "reject"
//! log_level = "info"
//!
//! [[hotkeys]]
//! id = "prompt_selector"
//! hotkey = "ctrl alt y"
//! enabled = true
//! ```
//!
//! # Serde default values
//!
//! Every field has a serde default, so an empty file, a file with only an
//! `[engine]` table, or a file written by an older version all load.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hotkey_core::{BindingSpec, DuplicatePolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("no config directory for this platform (is APPDATA or HOME set?)")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("cannot access hotkey config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("hotkey config is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("cannot write hotkey config as TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Contents of `config.toml`: engine tuning plus the hotkey bindings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default = "default_hotkeys")]
    pub hotkeys: Vec<BindingSpec>,
}

/// Engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Health monitor tick in milliseconds.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u64,
    /// A gesture with no press for longer than this is discarded.
    #[serde(default = "default_idle_reset_secs")]
    pub idle_reset_secs: u64,
    /// What to do with two enabled bindings on one chord.
    #[serde(default)]
    pub duplicate_policy: DuplicatePolicy,
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl EngineConfig {
    pub fn monitor_interval(&self) -> Duration {
        Duration::from_millis(self.monitor_interval_ms)
    }

    pub fn idle_reset(&self) -> Duration {
        Duration::from_secs(self.idle_reset_secs)
    }
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_monitor_interval_ms() -> u64 {
    3000
}
fn default_idle_reset_secs() -> u64 {
    30
}
fn default_log_level() -> String {
    "info".to_string()
}

/// The bindings shipped with a fresh install.
pub fn default_hotkeys() -> Vec<BindingSpec> {
    vec![
        BindingSpec::new("settings_window", "", false),
        BindingSpec::new("chat_window", "", false),
        BindingSpec::new("prompt_selector", "ctrl alt y", true),
        BindingSpec::new("Proofread", "ctrl alt x", true),
    ]
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            hotkeys: default_hotkeys(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: default_monitor_interval_ms(),
            idle_reset_secs: default_idle_reset_secs(),
            duplicate_policy: DuplicatePolicy::default(),
            log_level: default_log_level(),
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// The `Hotkeyd` directory under the platform config base.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// `<config_dir>/config.toml`.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file, returning
/// `AppConfig::default()` if the file does not yet exist.
///
/// # Errors
///
/// See [`load_config_at`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_at(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_at(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Loads the platform config file, writing the stock configuration there on
/// first run so the user has a file to edit.
///
/// # Errors
///
/// See [`load_or_init_config_at`].
pub fn load_or_init_config() -> Result<AppConfig, ConfigError> {
    load_or_init_config_at(&config_file_path()?)
}

/// Loads `AppConfig` from `path`; if the file does not exist, saves
/// `AppConfig::default()` there and returns it.  An existing file is never
/// overwritten.
///
/// # Errors
///
/// Returns the errors of [`load_config_at`] and [`save_config_at`].
pub fn load_or_init_config_at(path: &Path) -> Result<AppConfig, ConfigError> {
    if path.exists() {
        return load_config_at(path);
    }
    let config = AppConfig::default();
    save_config_at(path, &config)?;
    Ok(config)
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_at(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Resolves the platform config directory including the `Hotkeyd` subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        // %APPDATA% e.g. C:\Users\<user>\AppData\Roaming
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("Hotkeyd"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("hotkeyd"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("Hotkeyd")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
