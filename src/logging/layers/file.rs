use crate::logging::config::{LogFormat, LoggingConfig};
use crate::logging::layers::BoxLayer;
use crate::Result;
use anyhow::{anyhow, Context};
use dirs_next::home_dir;
use std::fs::{create_dir_all, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::{self as tracing_fmt, writer::BoxMakeWriter};
use tracing_subscriber::registry::LookupSpan;

pub const LOG_FILE_NAME: &str = "composer-dbt.log";

/// Log file location, or `None` when file logging is not configured.
///
/// Relative directories are resolved against the home directory.
pub fn log_file_path(config: &LoggingConfig) -> Result<Option<PathBuf>> {
    let Some(dir) = &config.log_dir else {
        return Ok(None);
    };
    let directory = if dir.is_absolute() {
        dir.clone()
    } else {
        home_dir()
            .ok_or_else(|| anyhow!("$HOME directory unavailable"))?
            .join(dir)
    };
    Ok(Some(directory.join(LOG_FILE_NAME)))
}

/// Build a tracing layer that appends to `log_file` via a non-blocking writer.
pub fn file_layer<S>(log_file: &Path, format: LogFormat) -> Result<(BoxLayer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    ensure_log_dir(log_file)?;
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .with_context(|| format!("failed to open log file {}", log_file.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);
    let writer = BoxMakeWriter::new(move || non_blocking.clone());
    let layer = tracing_fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false);

    let boxed: BoxLayer<S> = match format {
        LogFormat::Text => Box::new(layer),
        LogFormat::Json => Box::new(layer.json()),
    };
    Ok((boxed, guard))
}

fn ensure_log_dir(log_file: &Path) -> Result<()> {
    let directory = log_file.parent().ok_or_else(|| {
        anyhow!(
            "log file path {} has no parent directory",
            log_file.display()
        )
    })?;
    create_dir_all(directory)
        .with_context(|| format!("failed to create log directory {}", directory.display()))?;
    Ok(())
}
