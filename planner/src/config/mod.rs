//! Configuration for the planner client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/planner/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::engine::EngineOptions;
use crate::view::SortMode;

/// Default API base URL of the task store.
pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),

    /// The API base URL is not a valid absolute URL.
    #[error("invalid api url {value:?}: {source}")]
    InvalidUrl {
        /// The rejected value.
        value: String,
        /// Parse failure.
        source: url::ParseError,
    },
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    engine: EngineFileConfig,
    preferences: PreferencesFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    /// `0` disables the timeout.
    request_timeout_ms: Option<u64>,
}

/// `[engine]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct EngineFileConfig {
    event_buffer: Option<usize>,
}

/// `[preferences]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PreferencesFileConfig {
    path: Option<PathBuf>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the task store API.
    pub api_url: Url,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Capacity of the mutation event channel.
    pub event_buffer: usize,
    /// Preferences file; `None` uses `~/.config/planner/preferences.toml`.
    pub preferences_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            api_url: default_api_url(),
            request_timeout: engine.request_timeout,
            event_buffer: engine.event_buffer,
            preferences_path: None,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// the file cannot be parsed, or the API URL is invalid.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Self::resolve(cli, &file)
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_url = match cli.api_url.as_ref().or(file.api.base_url.as_ref()) {
            Some(raw) => Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
                value: raw.clone(),
                source,
            })?,
            None => defaults.api_url,
        };

        Ok(Self {
            api_url,
            request_timeout: file
                .api
                .request_timeout_ms
                .map_or(defaults.request_timeout, |ms| {
                    (ms > 0).then(|| Duration::from_millis(ms))
                }),
            event_buffer: file
                .engine
                .event_buffer
                .unwrap_or(defaults.event_buffer),
            preferences_path: cli
                .preferences
                .clone()
                .or_else(|| file.preferences.path.clone()),
        })
    }

    /// Engine tunables derived from this configuration.
    #[must_use]
    pub const fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            event_buffer: self.event_buffer,
            request_timeout: self.request_timeout,
        }
    }
}

fn default_api_url() -> Url {
    Url::parse(DEFAULT_API_URL).unwrap_or_else(|_| unreachable!("default api url is valid"))
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task planner client with optimistic updates")]
pub struct CliArgs {
    /// Base URL of the task store API.
    #[arg(long, env = "PLANNER_API_URL")]
    pub api_url: Option<String>,

    /// Path to config file (default: `~/.config/planner/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Path to the preferences file.
    #[arg(long)]
    pub preferences: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "PLANNER_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/planner.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do; defaults to `demo`.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands of the `planner` binary.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Persist the sort mode used by task views.
    Sort {
        /// One of `custom`, `date`, `name`.
        mode: SortMode,
    },
    /// Print every list with its tasks, fetched from the API.
    Show,
    /// Run a scripted session against an in-process task store.
    Demo,
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    }
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(ConfigFile::default());
    };
    let path = config_dir.join("planner").join("config.toml");

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
