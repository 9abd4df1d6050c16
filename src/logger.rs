use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{Context, Result, anyhow};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const APP_NAME: &str = "sandboxctl";
const LOG_FILE: &str = "sandboxctl.log";

/// Overrides the log file location entirely.
const LOG_PATH_ENV: &str = "SANDBOXCTL_LOG_FILE";

static INIT: OnceLock<()> = OnceLock::new();
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Install the global subscriber. Logs go to a file; with `verbose` they are
/// mirrored to stderr as well. Calling twice is a no-op.
pub fn init(verbose: bool) -> Result<()> {
    if INIT.get().is_some() {
        return Ok(());
    }

    init_inner(verbose)?;
    let _ = INIT.set(());
    Ok(())
}

fn init_inner(verbose: bool) -> Result<()> {
    let log_path = determine_log_path(
        |key| std::env::var(key).ok(),
        home::home_dir(),
        std::env::current_dir().ok(),
    )?;
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory at {}", parent.display()))?;
    }

    let (directory, file_name) = split_path(&log_path)?;
    let (non_blocking, guard) = tracing_appender::non_blocking(rolling::never(directory, file_name));
    let _ = GUARD.set(guard);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(if verbose { "debug" } else { "info" })
    });

    let stderr_layer = verbose.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(false),
        )
        .with(stderr_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    Ok(())
}

/// Log file location: explicit override, then `$XDG_STATE_HOME`, then
/// `~/.local/state`, then the working directory.
fn determine_log_path(
    env: impl Fn(&str) -> Option<String>,
    home_dir: Option<PathBuf>,
    cwd: Option<PathBuf>,
) -> Result<PathBuf> {
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());

    if let Some(path) = non_empty(LOG_PATH_ENV) {
        return Ok(PathBuf::from(path));
    }

    if let Some(state_home) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(state_home).join(APP_NAME).join(LOG_FILE));
    }

    if let Some(home_dir) = home_dir {
        return Ok(home_dir
            .join(".local")
            .join("state")
            .join(APP_NAME)
            .join(LOG_FILE));
    }

    cwd.map(|dir| dir.join(LOG_FILE))
        .ok_or_else(|| anyhow!("Could not determine a location for the log file"))
}

fn split_path(path: &Path) -> Result<(PathBuf, &str)> {
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow!("Invalid log file name: {}", path.display()))?;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    Ok((dir, file_name))
}
