// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracing subscriber setup for `fleetd`.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter {directive:?}: {source}")]
    Filter {
        directive: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
    #[error("log file path has no file name: {0}")]
    FilePath(String),
    #[error("failed to install subscriber: {0}")]
    Init(String),
}

/// Build the filter for a directive such as `info` or `fleet_daemon=debug`.
pub fn filter(directive: &str) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_new(directive)
        .map_err(|source| LoggingError::Filter { directive: directive.to_string(), source })
}

/// Install the global subscriber. Logs go to stderr unless a file is
/// configured; keep the returned guard alive to flush the file writer.
pub fn init(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let filter = filter(&config.level)?;
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let Some(path) = config.file.as_deref() else {
        builder
            .with_writer(std::io::stderr)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))?;
        return Ok(None);
    };

    let (dir, name) = split_path(path)?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
    builder
        .with_ansi(false)
        .with_writer(writer)
        .try_init()
        .map_err(|e| LoggingError::Init(e.to_string()))?;
    Ok(Some(guard))
}

fn split_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), LoggingError> {
    let name = path.file_name().ok_or_else(|| LoggingError::FilePath(path.display().to_string()))?;
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    Ok((dir, name))
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
