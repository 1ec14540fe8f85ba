//! Persisted client-side preferences.
//!
//! The preferences file holds a single `sort_mode` key:
//!
//! ```toml
//! sort_mode = "DATE"
//! ```
//!
//! Reading never fails: a missing file, an unreadable file or an unknown
//! value all yield [`SortMode::Custom`].

use std::path::{Path, PathBuf};

use crate::view::SortMode;

/// Errors raised while persisting preferences.
#[derive(Debug, thiserror::Error)]
pub enum PreferenceError {
    /// The platform has no configuration directory.
    #[error("no configuration directory on this platform")]
    NoConfigDir,

    /// Failed to write the preferences file.
    #[error("failed to write preferences {path}: {source}")]
    WriteFile {
        /// Target path.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to serialize the preferences.
    #[error("failed to serialize preferences: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
#[serde(default)]
struct PreferenceFile {
    sort_mode: Option<String>,
}

/// Default preferences location: `~/.config/planner/preferences.toml`.
///
/// # Errors
///
/// Returns [`PreferenceError::NoConfigDir`] when the platform has no
/// configuration directory.
pub fn default_path() -> Result<PathBuf, PreferenceError> {
    dirs::config_dir()
        .map(|dir| dir.join("planner").join("preferences.toml"))
        .ok_or(PreferenceError::NoConfigDir)
}

/// Reads the persisted sort mode, falling back to [`SortMode::Custom`].
#[must_use]
pub fn load_sort_mode(path: &Path) -> SortMode {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return SortMode::default(),
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "cannot read preferences");
            return SortMode::default();
        }
    };
    let file: PreferenceFile = match toml::from_str(&contents) {
        Ok(file) => file,
        Err(error) => {
            tracing::warn!(path = %path.display(), %error, "malformed preferences");
            return SortMode::default();
        }
    };
    let Some(raw) = file.sort_mode else {
        return SortMode::default();
    };
    raw.parse().unwrap_or_else(|error| {
        tracing::warn!(%error, "unknown sort mode in preferences, using CUSTOM");
        SortMode::default()
    })
}

/// Persists `mode`, creating the parent directory if needed.
///
/// # Errors
///
/// Returns [`PreferenceError::WriteFile`] if the file or its directory cannot
/// be written.
pub fn save_sort_mode(path: &Path, mode: SortMode) -> Result<(), PreferenceError> {
    let write_err = |source| PreferenceError::WriteFile {
        path: path.to_path_buf(),
        source,
    };
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(write_err)?;
    }
    let file = PreferenceFile {
        sort_mode: Some(mode.as_str().to_string()),
    };
    let contents = toml::to_string(&file)?;
    std::fs::write(path, contents).map_err(write_err)?;
    tracing::debug!(path = %path.display(), %mode, "sort mode saved");
    Ok(())
}
