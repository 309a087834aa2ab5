use std::fs::{self, OpenOptions};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::{self, WorkerGuard};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;

/// Keeps the file writer flushing until dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
}

fn filter_for(logging: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level))
}

/// Install the global subscriber. Logs go to stderr, and additionally to
/// `logging.file` when set; the returned guard must outlive the program's
/// logging.
pub fn init_logging(logging: &LoggingConfig) -> Result<Option<LoggingGuard>> {
    let filter = filter_for(logging);
    let builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::NONE)
        .with_thread_names(true);

    let Some(path) = &logging.file else {
        // Ignore error if a global subscriber is already set (e.g., when running in tests)
        let _ = if logging.json {
            tracing::subscriber::set_global_default(
                builder.json().with_writer(std::io::stderr).finish(),
            )
        } else {
            tracing::subscriber::set_global_default(builder.with_writer(std::io::stderr).finish())
        };
        return Ok(None);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory at {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file at {}", path.display()))?;

    let (writer, guard) = non_blocking::NonBlockingBuilder::default()
        .lossy(false)
        .finish(file);
    let writer = std::io::stderr.and(writer);

    let _ = if logging.json {
        tracing::subscriber::set_global_default(builder.json().with_writer(writer).finish())
    } else {
        tracing::subscriber::set_global_default(
            builder.with_ansi(false).with_writer(writer).finish(),
        )
    };

    Ok(Some(LoggingGuard { _guard: guard }))
}
