//! jshint-ls - JSHint language server over stdio.
//!
//! stdout carries the protocol, so logs go to `~/.jshint-ls/logs/jshint-ls.log`
//! (or stderr when no log file can be opened).

use std::{
    fs::{self, OpenOptions},
    io,
    path::PathBuf,
    sync::Mutex,
};

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use jshint_ls_config::LauncherSettings;
use jshint_ls_lsp::{NodeLoader, OptionsResolver, serve};

const LOG_ENV: &str = "JSHINT_LS_LOG";

fn env_filter(settings: &LauncherSettings) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .ok()
        .or_else(|| {
            settings
                .log
                .filter
                .as_deref()
                .and_then(|filter| EnvFilter::try_new(filter).ok())
        })
        .unwrap_or_else(|| EnvFilter::new("info"))
}

fn init_tracing(settings: &LauncherSettings, mut warnings: Vec<String>) {
    let env_filter = env_filter(settings);
    let (log_file, open_warnings) = open_log_file();
    warnings.extend(open_warnings);

    if let Some((log_path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();
        tracing::info!(path = %log_path.display(), "Logging initialized");
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(io::stderr))
            .with(env_filter)
            .init();
    }

    for warning in warnings {
        tracing::warn!("{warning}");
    }
}

fn open_log_file() -> (Option<(PathBuf, fs::File)>, Vec<String>) {
    let mut warnings = Vec::new();
    let Some(dir) = LauncherSettings::dir() else {
        return (None, warnings);
    };
    let candidate = dir.join("logs").join("jshint-ls.log");

    if let Some(parent) = candidate.parent()
        && let Err(e) = fs::create_dir_all(parent)
    {
        warnings.push(format!(
            "Failed to create log dir {}: {e}",
            parent.display()
        ));
        return (None, warnings);
    }

    match OpenOptions::new()
        .create(true)
        .append(true)
        .open(&candidate)
    {
        Ok(file) => (Some((candidate, file)), warnings),
        Err(e) => {
            warnings.push(format!(
                "Failed to open log file {}: {e}",
                candidate.display()
            ));
            (None, warnings)
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let mut warnings = Vec::new();
    let settings = match LauncherSettings::load() {
        Ok(settings) => settings.unwrap_or_default(),
        Err(e) => {
            warnings.push(format!("Ignoring {}: {e}", e.path().display()));
            LauncherSettings::default()
        }
    };
    init_tracing(&settings, warnings);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting jshint-ls");
    let loader = NodeLoader::new(settings.linter.node, settings.linter.module);
    let code = match serve(
        tokio::io::stdin(),
        tokio::io::stdout(),
        loader,
        OptionsResolver::new(),
    )
    .await
    {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::error!("Server loop failed: {e:#}");
            1
        }
    };

    tracing::info!(code, "Exiting");
    std::process::exit(code);
}
