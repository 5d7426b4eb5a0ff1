//! Configuration for jshint-ls.
//!
//! Two unrelated layers live here:
//!
//! - [`OptionsResolver`]: per-document JSHint options, discovered on disk
//!   (`package.json`, `.jshintrc`, `~/.jshintrc`) or supplied by the editor,
//!   cached per path.
//! - [`LauncherSettings`]: how the server process itself runs (node binary,
//!   library module, log filter), read once at startup from
//!   `~/.jshint-ls/config.toml`.

pub mod jsonc;

mod resolver;
mod settings;

pub use resolver::{
    ConfigError, EditorOptions, JSHINTRC, OptionsCache, OptionsResolver, PACKAGE_JSON,
    PACKAGE_JSON_KEY, Resolution, locate_file,
};
pub use settings::{LauncherSettings, LinterSettings, LogSettings, SettingsError};

pub use jshint_ls_types::Options;
