// ABOUTME: Shared logging setup for hoster binaries
// ABOUTME: init() logs to stderr, init_file() keeps the console prompt clean by logging to a file

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Standard logging to stderr. Default: INFO level, RUST_LOG override.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// File-based logging for the interactive console. Default: WARN level, RUST_LOG override.
/// Logs to ~/.config/hoster/{app_name}.log
/// If setup fails, prints a warning to stderr and continues without logging.
pub fn init_file(app_name: &str) {
    let Some(path) = log_path(app_name) else {
        eprintln!("warning: could not determine config directory, logging disabled");
        return;
    };

    match open_log_file(&path) {
        Ok(log_file) => {
            tracing_subscriber::fmt()
                .with_writer(log_file)
                .with_env_filter(
                    EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
                )
                .with_ansi(false)
                .init();
        }
        Err(e) => eprintln!("warning: failed to open log file {}: {e}", path.display()),
    }
}

/// Where `init_file` writes for the given app name.
pub fn log_path(app_name: &str) -> Option<PathBuf> {
    dirs::config_dir().map(|dir| log_path_in(&dir, app_name))
}

fn log_path_in(config_dir: &Path, app_name: &str) -> PathBuf {
    config_dir.join("hoster").join(format!("{app_name}.log"))
}

/// Open the log for appending, creating missing parent directories.
fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
