//! Subscriber setup for the binary. Library crates only emit events.

use std::path::Path;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// File name prefix of the rolling log; the appender adds the date.
pub const LOG_FILE_PREFIX: &str = "partscan.log";

/// Filter directive for the configured level, raised by `-v` flags.
pub fn filter_directive(config: &LoggingConfig, verbose: u8) -> String {
    match verbose {
        0 => config.level.to_ascii_lowercase(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Non-blocking writer to a daily rotated log file in `dir`, created if
/// missing. Events are flushed when the guard is dropped.
pub fn rolling_file(dir: &Path) -> anyhow::Result<(NonBlocking, WorkerGuard)> {
    std::fs::create_dir_all(dir)?;
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Ok(tracing_appender::non_blocking(appender))
}

/// Installs the global subscriber. `RUST_LOG` overrides the configured level.
/// Events go to stderr so command output on stdout stays machine-readable,
/// and to a rolling file when `log_directory` is set.
///
/// The returned guard must be held until exit or buffered file events are
/// lost.
pub fn init_logging(config: &LoggingConfig, verbose: u8) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config, verbose)));

    let mut layers = Vec::new();
    if config.json {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .boxed(),
        );
    }

    let guard = match &config.log_directory {
        Some(dir) => {
            let (writer, guard) = rolling_file(dir)?;
            layers.push(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_target(true)
                    .boxed(),
            );
            Some(guard)
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()?;

    tracing::debug!(?config, "logging initialised");
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn verbosity_raises_level() {
        let config = LoggingConfig {
            level: "WARN".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(filter_directive(&config, 0), "warn");
        assert_eq!(filter_directive(&config, 1), "debug");
        assert_eq!(filter_directive(&config, 4), "trace");
    }

    #[test]
    fn rolling_file_lands_in_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");

        let (mut writer, guard) = rolling_file(&dir).unwrap();
        writer.write_all(b"capture finished\n").unwrap();
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(&dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(LOG_FILE_PREFIX), "{name}");
        let content = std::fs::read_to_string(&files[0]).unwrap();
        assert_eq!(content, "capture finished\n");
    }
}
