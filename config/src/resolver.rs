//! Per-document JSHint option discovery.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde_json::Value;

use crate::jsonc;
use jshint_ls_types::Options;

/// Dotfile looked up beside the document, in its ancestors, and in `$HOME`.
pub const JSHINTRC: &str = ".jshintrc";

/// Package manifest that may embed options.
pub const PACKAGE_JSON: &str = "package.json";

/// Manifest key holding the embedded options object.
pub const PACKAGE_JSON_KEY: &str = "jshintConfig";

/// Editor setting naming an explicit configuration file.
const OVERRIDE_KEY: &str = "config";

/// A configuration file that could not be loaded.
///
/// The resolver never fails outward; these are handed back alongside the
/// substituted empty options so the caller can tell the user.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("{} does not contain a JSON object", path.display())]
    NotAnObject { path: PathBuf },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Read { path, .. } | Self::Parse { path, .. } | Self::NotAnObject { path } => {
                path
            }
        }
    }

    /// The message shown to the user in the editor.
    #[must_use]
    pub fn user_message(&self) -> String {
        format!(
            "Can't load JSHint configuration from file {}. Please check the file for syntax errors.",
            self.path().display()
        )
    }
}

/// Options supplied through editor settings (`jshint.options`).
#[derive(Debug, Clone, Default)]
pub struct EditorOptions {
    /// Explicit configuration file; wins over anything discovered on disk.
    config: Option<PathBuf>,
    /// Everything else: the fallback options when nothing is found.
    defaults: Arc<Options>,
}

impl EditorOptions {
    /// Split the raw settings object into the override path and defaults.
    #[must_use]
    pub fn from_settings(mut settings: Options) -> Self {
        let config = settings
            .remove(OVERRIDE_KEY)
            .and_then(|value| value.as_str().map(str::to_owned))
            .filter(|path| !path.trim().is_empty())
            .map(PathBuf::from);
        Self {
            config,
            defaults: Arc::new(settings),
        }
    }

    #[must_use]
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    #[must_use]
    pub fn defaults(&self) -> &Arc<Options> {
        &self.defaults
    }
}

/// Result of a lookup: the options plus any files that failed to load.
///
/// `errors` is only populated when files were actually read; a cache hit
/// carries none.
#[derive(Debug)]
pub struct Resolution {
    pub options: Arc<Options>,
    pub errors: Vec<ConfigError>,
}

/// Path → resolved options. Cleared wholesale, never partially.
#[derive(Debug, Default)]
pub struct OptionsCache {
    entries: HashMap<PathBuf, Arc<Options>>,
}

impl OptionsCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, path: &Path) -> Option<Arc<Options>> {
        self.entries.get(path).cloned()
    }

    pub fn insert(&mut self, path: PathBuf, options: Arc<Options>) {
        self.entries.insert(path, options);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Finds the options that apply to a document.
///
/// Lookup order, first hit wins:
///
/// 1. the editor's explicit `config` file, if it exists (never cached)
/// 2. `jshintConfig` in the nearest `package.json`, if non-empty
/// 3. the nearest `.jshintrc`
/// 4. `~/.jshintrc`
/// 5. the editor's remaining options
pub struct OptionsResolver {
    cache: OptionsCache,
    editor: EditorOptions,
    home: Option<PathBuf>,
}

impl OptionsResolver {
    /// Resolver rooted at the current user's home directory.
    #[must_use]
    pub fn new() -> Self {
        Self::with_home(dirs::home_dir())
    }

    /// Resolver with an explicit home directory (or none).
    #[must_use]
    pub fn with_home(home: Option<PathBuf>) -> Self {
        Self {
            cache: OptionsCache::new(),
            editor: EditorOptions::default(),
            home,
        }
    }

    /// Drop every cached entry, optionally installing new editor options.
    pub fn clear(&mut self, editor: Option<EditorOptions>) {
        self.cache.clear();
        if let Some(editor) = editor {
            self.editor = editor;
        }
    }

    #[must_use]
    pub fn editor(&self) -> &EditorOptions {
        &self.editor
    }

    #[must_use]
    pub fn cache(&self) -> &OptionsCache {
        &self.cache
    }

    pub fn get_options(&mut self, path: &Path) -> Resolution {
        if let Some(config) = self.editor.config()
            && config.exists()
        {
            let mut errors = Vec::new();
            let options = read_options_file(config, &mut errors);
            return Resolution {
                options: Arc::new(options),
                errors,
            };
        }

        if let Some(options) = self.cache.get(path) {
            return Resolution {
                options,
                errors: Vec::new(),
            };
        }

        let mut errors = Vec::new();
        let options = self.discover(path, &mut errors);
        tracing::debug!(
            path = %path.display(),
            cached = self.cache.len(),
            "Resolved JSHint options"
        );
        self.cache.insert(path.to_path_buf(), Arc::clone(&options));
        Resolution { options, errors }
    }

    fn discover(&self, path: &Path, errors: &mut Vec<ConfigError>) -> Arc<Options> {
        if !path.as_os_str().is_empty() {
            if let Some(manifest) = locate_file(path, PACKAGE_JSON) {
                let mut content = read_options_file(&manifest, errors);
                if let Some(Value::Object(embedded)) = content.remove(PACKAGE_JSON_KEY)
                    && !embedded.is_empty()
                {
                    tracing::debug!(file = %manifest.display(), "Using embedded jshintConfig");
                    return Arc::new(embedded);
                }
            }

            if let Some(rc) = locate_file(path, JSHINTRC) {
                tracing::debug!(file = %rc.display(), "Using .jshintrc");
                return Arc::new(read_options_file(&rc, errors));
            }
        }

        if let Some(home) = &self.home {
            let rc = home.join(JSHINTRC);
            if rc.exists() {
                tracing::debug!(file = %rc.display(), "Using home .jshintrc");
                return Arc::new(read_options_file(&rc, errors));
            }
        }

        Arc::clone(self.editor.defaults())
    }
}

impl Default for OptionsResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Walk from `start` towards the root looking for `file_name`.
///
/// `start` itself is searched first. The walk stops once the parent of a
/// directory is that directory.
#[must_use]
pub fn locate_file(start: &Path, file_name: &str) -> Option<PathBuf> {
    let mut parent = start.to_path_buf();
    loop {
        let directory = parent;
        let candidate = directory.join(file_name);
        if candidate.exists() {
            return Some(candidate);
        }
        parent = parent_dir(&directory);
        if parent == directory {
            return None;
        }
    }
}

fn parent_dir(directory: &Path) -> PathBuf {
    match directory.parent() {
        Some(parent) if parent.as_os_str().is_empty() => PathBuf::from("."),
        Some(parent) => parent.to_path_buf(),
        None => directory.to_path_buf(),
    }
}

/// Read a JSON-with-comments object; on failure record why and yield `{}`.
fn read_options_file(path: &Path, errors: &mut Vec<ConfigError>) -> Options {
    match load_object(path) {
        Ok(options) => options,
        Err(error) => {
            tracing::warn!("{error}");
            errors.push(error);
            Options::new()
        }
    }
}

fn load_object(path: &Path) -> Result<Options, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match jsonc::from_str(&content) {
        Ok(Value::Object(options)) => Ok(options),
        Ok(_) => Err(ConfigError::NotAnObject {
            path: path.to_path_buf(),
        }),
        Err(source) => Err(ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        }),
    }
}
