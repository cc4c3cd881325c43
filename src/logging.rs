//! Logging configuration. The TUI holds the terminal in an alternate screen
//! while it runs, so log output goes to a file beside the store instead of
//! stdout.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Log file name inside the application data directory.
pub const LOG_FILE_NAME: &str = "recipe-book.log";
/// Filter applied when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "recipe_book=info";

/// Initialize the logging system, appending to the file at `path`.
///
/// Called once at startup, before the terminal is taken over. The `RUST_LOG`
/// environment variable overrides the default filter.
pub fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create log directory")?;
    }
    let file = File::options()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = tracing_subscriber::registry().with(env_filter).with(
        fmt::layer()
            .with_target(true)
            .with_ansi(false)
            .with_writer(Mutex::new(file)),
    );

    // Ignore the error if a subscriber is already set (tests do this).
    let _ = subscriber.try_init();
    Ok(())
}

/// Initialize logging for tests: warnings and errors only, captured by the
/// test harness instead of a file.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_log(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("recipe-book-log-{}-{}", name, std::process::id()))
            .join(LOG_FILE_NAME)
    }

    #[test]
    fn test_init_logging_creates_the_file() {
        let path = temp_log("create");
        let _ = fs::remove_dir_all(path.parent().unwrap());

        init_logging(&path).unwrap();
        assert!(path.exists());

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_init_logging_twice_is_quiet() {
        let path = temp_log("twice");
        let _ = fs::remove_dir_all(path.parent().unwrap());

        init_logging(&path).unwrap();
        init_logging(&path).unwrap();

        let _ = fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_init_test_logging_does_not_panic() {
        init_test_logging();
    }
}
