/// Tracing setup. The game owns the terminal, so logs go to a file.
///
/// Log file, first that opens:
///   1. `$MIRRORPATH_LOG`
///   2. `~/.local/share/mirrorpath/mirrorpath.log`
///   3. `<tmp>/mirrorpath.log`
///
/// `RUST_LOG` overrides the default `info` filter.

use std::fs::{self, File, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::data_home;

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (log_file, warnings) = open_log_file();

    if let Some((path, file)) = log_file {
        tracing_subscriber::registry()
            .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
            .with(env_filter)
            .init();

        tracing::info!(path = %path.display(), "logging initialized");
        for warning in warnings {
            tracing::warn!("{warning}");
        }
        return;
    }

    // No file: drop logs rather than draw over the game screen
    tracing_subscriber::registry().with(env_filter).init();
}

fn open_log_file() -> (Option<(PathBuf, File)>, Vec<String>) {
    let mut warnings = Vec::new();

    for candidate in log_file_candidates() {
        if let Some(parent) = candidate.parent() {
            if let Err(e) = fs::create_dir_all(parent) {
                warnings.push(format!("failed to create log dir {}: {e}", parent.display()));
                continue;
            }
        }

        match OpenOptions::new().create(true).append(true).open(&candidate) {
            Ok(file) => return (Some((candidate, file)), warnings),
            Err(e) => {
                warnings.push(format!("failed to open log file {}: {e}", candidate.display()));
            }
        }
    }

    (None, warnings)
}

fn log_file_candidates() -> Vec<PathBuf> {
    let mut candidates = Vec::new();

    if let Some(path) = std::env::var_os("MIRRORPATH_LOG") {
        if !path.is_empty() {
            candidates.push(PathBuf::from(path));
        }
    }
    if let Some(dir) = data_home() {
        candidates.push(dir.join("mirrorpath.log"));
    }
    candidates.push(std::env::temp_dir().join("mirrorpath.log"));

    candidates
}
