//! Logging setup - stderr plus a daily file under `<root>/Logs`

use chrono::Utc;
use std::fs::OpenOptions;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const RESTART_PREFIX: &str = "=== Restart";

/// Install the global subscriber. With `log_dir`, events are also appended
/// to `<log_dir>/<YYYY-MM-DD>.log`.
pub fn init(debug: bool, log_dir: Option<&Path>) -> anyhow::Result<()> {
    let log_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let file_layer = match log_dir {
        Some(dir) => {
            mark_restart(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_suffix("log")
                .build(dir)?;
            Some(fmt::layer().with_ansi(false).with_writer(appender))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .init();

    Ok(())
}

/// Today's log file (same name the daily appender uses)
pub fn log_file_path(dir: &Path) -> PathBuf {
    dir.join(format!("{}.log", Utc::now().format("%Y-%m-%d")))
}

/// Append a restart separator unless the file already ends with one
pub fn mark_restart(dir: &Path) -> io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let path = log_file_path(dir);

    let last_line = match std::fs::File::open(&path) {
        Ok(file) => BufReader::new(file).lines().map_while(Result::ok).last(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    if last_line.is_some_and(|line| line.starts_with(RESTART_PREFIX)) {
        return Ok(());
    }

    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    writeln!(
        file,
        "{} {} ===",
        RESTART_PREFIX,
        Utc::now().format("%Y-%m-%d %H:%M:%S")
    )
}
