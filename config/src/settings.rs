//! Launcher settings read from `~/.jshint-ls/config.toml`.
//!
//! ```toml
//! [linter]
//! node = "/usr/local/bin/node"
//! module = "jshint"
//!
//! [log]
//! filter = "debug"
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_MODULE: &str = "jshint";

fn default_module() -> String {
    DEFAULT_MODULE.to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl SettingsError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LauncherSettings {
    #[serde(default)]
    pub linter: LinterSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LinterSettings {
    /// Node executable. Defaults to `node` on `PATH`.
    pub node: Option<PathBuf>,
    /// Package name resolved from the workspace.
    #[serde(default = "default_module")]
    pub module: String,
}

impl Default for LinterSettings {
    fn default() -> Self {
        Self {
            node: None,
            module: default_module(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive, e.g. `"jshint_ls_lsp=debug"`.
    pub filter: Option<String>,
}

impl LauncherSettings {
    /// Load from the default location.
    ///
    /// `Ok(None)` when there is no home directory or no file.
    pub fn load() -> Result<Option<Self>, SettingsError> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, SettingsError> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content)
            .map(Some)
            .map_err(|source| SettingsError::Parse {
                path: path.to_path_buf(),
                source,
            })
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|dir| dir.join("config.toml"))
    }

    /// `~/.jshint-ls`, home of the settings file and logs.
    #[must_use]
    pub fn dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".jshint-ls"))
    }
}
