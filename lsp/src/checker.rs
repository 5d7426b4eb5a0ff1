//! The external checking function and how it is loaded.
//!
//! JSHint is a JavaScript library installed by the user, so checks run in a
//! node child process: a small bridge script `require`s the resolved package,
//! calls `JSHINT(source, options, globals)` and prints `JSHINT.errors`.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use jshint_ls_types::{LintError, Options};

const BRIDGE_SCRIPT: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/assets/bridge.js"));

/// Runs the linter over one document.
#[allow(async_fn_in_trait)]
pub trait Checker {
    /// The raw error list; `None` marks the holes JSHint leaves in it.
    async fn check(
        &self,
        source: &str,
        options: &Options,
        globals: &Options,
    ) -> Result<Vec<Option<LintError>>, CheckError>;
}

/// Produces a [`Checker`] during the `initialize` handshake.
#[allow(async_fn_in_trait)]
pub trait Loader {
    type Checker: Checker;

    async fn load(&self, workspace_root: Option<&Path>) -> Result<Self::Checker, LoadError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    /// Nothing to load; the user can install the package and retry.
    #[error(
        "Failed to load {module} library. Please install {module} in your workspace folder using 'npm install {module}' or globally using 'npm install -g {module}' and then press Retry."
    )]
    NotFound { module: String },
    /// The package is there but is not the library we expect.
    #[error("The {module} library doesn't export a JSHINT property.")]
    MissingExport { module: String },
}

impl LoadError {
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("failed to start {}: {source}", node.display())]
    Spawn {
        node: PathBuf,
        source: std::io::Error,
    },
    #[error("linter process I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The library threw; carries whatever message it had.
    #[error("{message}")]
    Failed { message: String },
    #[error("unexpected linter output: {0}")]
    Output(#[from] serde_json::Error),
}

impl CheckError {
    /// User-facing text, if the failure carries any.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Failed { message } if message.trim().is_empty() => None,
            other => Some(other.to_string()),
        }
    }
}

/// Loads the `jshint` package found for the workspace.
#[derive(Debug, Clone)]
pub struct NodeLoader {
    node: Option<PathBuf>,
    module: String,
}

impl NodeLoader {
    /// `node` overrides the executable; otherwise `node` is looked up on `PATH`.
    #[must_use]
    pub fn new(node: Option<PathBuf>, module: impl Into<String>) -> Self {
        Self {
            node,
            module: module.into(),
        }
    }

    fn not_found(&self) -> LoadError {
        LoadError::NotFound {
            module: self.module.clone(),
        }
    }
}

impl Loader for NodeLoader {
    type Checker = NodeJshint;

    async fn load(&self, workspace_root: Option<&Path>) -> Result<NodeJshint, LoadError> {
        let node = match &self.node {
            Some(node) => node.clone(),
            None => which::which("node").map_err(|e| {
                tracing::warn!("node not found in PATH: {e}");
                self.not_found()
            })?,
        };

        let Some(module) = resolve_module(workspace_root, &self.module).await else {
            tracing::warn!(
                root = ?workspace_root,
                "Package '{}' not found locally or globally",
                self.module
            );
            return Err(self.not_found());
        };
        tracing::info!(module = %module.display(), node = %node.display(), "Resolved linter library");

        let payload = serde_json::json!({ "module": module, "inspect": true });
        let export: ExportCheck = match run_bridge(&node, &payload).await {
            Ok(stdout) => serde_json::from_slice(&stdout).map_err(|e| {
                tracing::warn!("Unreadable export check output: {e}");
                self.not_found()
            })?,
            Err(e) => {
                tracing::warn!("Failed to require {}: {e}", module.display());
                return Err(self.not_found());
            }
        };

        if !export.exported {
            return Err(LoadError::MissingExport {
                module: self.module.clone(),
            });
        }

        Ok(NodeJshint { node, module })
    }
}

#[derive(Debug, Deserialize)]
struct ExportCheck {
    #[serde(default)]
    exported: bool,
}

#[derive(Debug, Deserialize)]
struct CheckOutput {
    #[serde(default)]
    errors: Vec<Value>,
}

/// A loaded library: node executable plus the package directory.
#[derive(Debug, Clone)]
pub struct NodeJshint {
    node: PathBuf,
    module: PathBuf,
}

impl Checker for NodeJshint {
    async fn check(
        &self,
        source: &str,
        options: &Options,
        globals: &Options,
    ) -> Result<Vec<Option<LintError>>, CheckError> {
        let payload = serde_json::json!({
            "module": self.module,
            "source": source,
            "options": options,
            "globals": globals,
        });
        let stdout = run_bridge(&self.node, &payload).await?;
        Ok(parse_errors(&stdout)?)
    }
}

fn parse_errors(stdout: &[u8]) -> serde_json::Result<Vec<Option<LintError>>> {
    let output: CheckOutput = serde_json::from_slice(stdout)?;
    Ok(output.errors.iter().map(LintError::from_value).collect())
}

/// Run the bridge once with `payload` on stdin; returns its stdout.
async fn run_bridge(node: &Path, payload: &Value) -> Result<Vec<u8>, CheckError> {
    let mut child = Command::new(node)
        .arg("-e")
        .arg(BRIDGE_SCRIPT)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| CheckError::Spawn {
            node: node.to_path_buf(),
            source,
        })?;

    let body = serde_json::to_vec(payload)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin.write_all(&body).await?;
        // Dropping stdin closes it so the bridge sees `end`.
    }

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let message = String::from_utf8_lossy(&output.stderr).trim().to_string();
        tracing::debug!(status = %output.status, "Linter bridge failed: {message}");
        return Err(CheckError::Failed { message });
    }
    Ok(output.stdout)
}

/// Find `module` the way node would for the workspace, then globally.
///
/// Order: `node_modules` in the workspace root and its ancestors, each
/// `NODE_PATH` entry, then the global `npm root -g`.
pub async fn resolve_module(workspace_root: Option<&Path>, module: &str) -> Option<PathBuf> {
    if let Some(found) = workspace_root.and_then(|root| find_local_module(root, module)) {
        return Some(found);
    }

    if let Some(node_path) = std::env::var_os("NODE_PATH") {
        let dirs: Vec<PathBuf> = std::env::split_paths(&node_path).collect();
        if let Some(found) = find_in_dirs(&dirs, module) {
            return Some(found);
        }
    }

    let global = npm_global_root().await?;
    find_in_dirs(&[global], module)
}

fn is_package(dir: &Path) -> bool {
    dir.join("package.json").is_file()
}

pub(crate) fn find_local_module(root: &Path, module: &str) -> Option<PathBuf> {
    root.ancestors()
        .map(|dir| dir.join("node_modules").join(module))
        .find(|candidate| is_package(candidate))
}

pub(crate) fn find_in_dirs(dirs: &[PathBuf], module: &str) -> Option<PathBuf> {
    dirs.iter()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(module))
        .find(|candidate| is_package(candidate))
}

async fn npm_global_root() -> Option<PathBuf> {
    let npm = which::which("npm").ok()?;
    let output = Command::new(npm)
        .args(["root", "-g"])
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!root.is_empty()).then(|| PathBuf::from(root))
}
