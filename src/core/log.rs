//! Logging initialization: console output plus `combined.log` and `error.log`.

use anyhow::{Context, Result};
use std::fs;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, fmt, layer::Filter, prelude::__tracing_subscriber_SubscriberExt,
    registry::LookupSpan, util::SubscriberInitExt,
};

use super::config::{LogFormat, LoggingConfig};

pub const COMBINED_LOG: &str = "combined.log";
pub const ERROR_LOG: &str = "error.log";

/// Keeps the background log writers alive. Dropping it flushes pending lines.
#[must_use = "logs are lost once the guards are dropped"]
pub struct LogGuards {
    _combined: WorkerGuard,
    _error: WorkerGuard,
}

/// Installs the global subscriber. Must be called once, before serving.
pub fn init_logging(verbose: bool, config: &LoggingConfig) -> Result<LogGuards> {
    let level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (subscriber, guards) = build_subscriber(env_filter, config)?;
    subscriber
        .try_init()
        .context("Failed to install global logger")?;

    Ok(guards)
}

fn build_subscriber(
    console_filter: EnvFilter,
    config: &LoggingConfig,
) -> Result<(impl Subscriber + Send + Sync + 'static, LogGuards)> {
    fs::create_dir_all(&config.directory).with_context(|| {
        format!(
            "Failed to create log directory: {}",
            config.directory.display()
        )
    })?;

    // Writes go through a single worker thread per file, so lines never interleave.
    let (combined_writer, combined_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&config.directory, COMBINED_LOG),
    );
    let (error_writer, error_guard) = tracing_appender::non_blocking(
        tracing_appender::rolling::never(&config.directory, ERROR_LOG),
    );

    let combined_filter = Targets::new()
        .with_target("fxproxy", LevelFilter::INFO)
        .with_default(LevelFilter::WARN);

    let subscriber = tracing_subscriber::registry()
        .with(fmt::layer().compact().with_filter(console_filter))
        .with(file_layer(combined_writer, config.format, combined_filter))
        .with(file_layer(error_writer, config.format, LevelFilter::ERROR));

    Ok((
        subscriber,
        LogGuards {
            _combined: combined_guard,
            _error: error_guard,
        },
    ))
}

fn file_layer<S, F>(writer: NonBlocking, format: LogFormat, filter: F) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    F: Filter<S> + Send + Sync + 'static,
{
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
        LogFormat::Text => fmt::layer()
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    }
}
