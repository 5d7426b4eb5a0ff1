//! Core domain types for jshint-ls.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! The config resolver and the language server both speak in these types.

mod diagnostic;
mod lint;

pub use diagnostic::{Diagnostic, DiagnosticSeverity, Position, Range};
pub use lint::LintError;

/// Linter options: option name → arbitrary JSON value.
///
/// May contain a nested `globals` object with global-variable permissions.
pub type Options = serde_json::Map<String, serde_json::Value>;

/// Source tag attached to every diagnostic this server publishes.
pub const DIAGNOSTIC_SOURCE: &str = "jshint";

/// Upstream `id` value marking a hard error (everything else is a warning).
pub const ERROR_ID: &str = "(error)";

/// Extract the `globals` object from resolved options.
///
/// Returns an empty map when `globals` is absent or not an object.
#[must_use]
pub fn globals_of(options: &Options) -> Options {
    match options.get("globals") {
        Some(serde_json::Value::Object(globals)) => globals.clone(),
        _ => Options::new(),
    }
}
