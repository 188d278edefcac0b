use crate::models::LoggingSettings;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Create the log directory and a daily rotating, non-blocking file writer
fn file_writer(
    settings: &LoggingSettings,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let log_path = Utf8PathBuf::from(&settings.dir);
    if !log_path.exists() {
        fs::create_dir_all(&log_path)
            .with_context(|| format!("Failed to create log directory: {}", settings.dir))?;
    }

    let file_appender = rolling::daily(&settings.dir, &settings.prefix);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// `RUST_LOG` wins when set; otherwise debug or info per settings
fn env_filter(debug_mode: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if debug_mode {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("info")
        }
    })
}

/// Setup logging with a daily rotating file appender only.
///
/// # Returns
/// A guard that must be held for the duration of the program to keep logging active
pub fn setup_logging(settings: &LoggingSettings) -> Result<WorkerGuard> {
    let (non_blocking, guard) = file_writer(settings)?;

    tracing_subscriber::registry()
        .with(env_filter(settings.debug))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false) // No ANSI codes in log files
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}",
        settings.dir,
        settings.prefix,
        settings.debug
    );

    Ok(guard)
}

/// Setup logging with the file appender plus, when `settings.console` is set,
/// a stderr layer.
///
/// Console output goes to stderr so it never interleaves with the report lines
/// written to stdout.
pub fn setup_logging_with_console(settings: &LoggingSettings) -> Result<WorkerGuard> {
    if !settings.console {
        return setup_logging(settings);
    }

    let (non_blocking, guard) = file_writer(settings)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter(settings.debug))
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!(
        "Logging initialized: dir={}, prefix={}, debug={}, console=true",
        settings.dir,
        settings.prefix,
        settings.debug
    );

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_setup_logging_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let log_dir = temp_dir.path().join("logs");
        let settings = LoggingSettings {
            dir: log_dir.to_str().unwrap().to_string(),
            prefix: "test".to_string(),
            debug: false,
            console: false,
        };

        // May fail if another test already installed a global subscriber,
        // but the directory is created first either way
        let _result = setup_logging(&settings);

        assert!(log_dir.exists());
    }
}
