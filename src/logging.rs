/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::{Level, Subscriber};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    EnvFilter,
};

use crate::config::ClientConfig;
use crate::error::{CollectorError, Result};

/// Effective level after the verbose shorthand is applied
pub fn effective_level(config: &ClientConfig) -> Level {
    if config.verbose {
        Level::DEBUG
    } else {
        config.log_level.to_tracing_level()
    }
}

/// Subscriber boxed so the stdout and file layouts share one type
pub type BoxedSubscriber = Box<dyn Subscriber + Send + Sync + 'static>;

/// `RUST_LOG` when set, else this crate at the configured level
fn log_filter(config: &ClientConfig) -> Result<EnvFilter> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("vsphere_collector={}", effective_level(config))))
        .map_err(|e| CollectorError::Config(format!("Failed to create log filter: {}", e)))
}

/// Build the subscriber described by `config` without installing it
pub fn build_subscriber(config: &ClientConfig) -> Result<BoxedSubscriber> {
    let env_filter = log_filter(config)?;

    match config.log_file {
        Some(ref log_path) => file_subscriber(log_path, env_filter),
        None => Ok(stdout_subscriber(env_filter)),
    }
}

/// Install the configured subscriber as the process-wide default
pub fn init_logging(config: &ClientConfig) -> Result<()> {
    let subscriber = build_subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| CollectorError::Config(format!("Failed to install subscriber: {}", e)))
}

fn stdout_subscriber(env_filter: EnvFilter) -> BoxedSubscriber {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    Box::new(tracing_subscriber::registry().with(env_filter).with(fmt_layer))
}

/// JSON lines to a file, no ANSI
fn file_subscriber(log_path: &Path, env_filter: EnvFilter) -> Result<BoxedSubscriber> {
    let file = File::create(log_path)
        .map_err(|e| CollectorError::Config(format!("Failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    Ok(Box::new(
        tracing_subscriber::registry().with(env_filter).with(fmt_layer),
    ))
}

/// Initialize logging with custom format for testing
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    use tracing_subscriber::util::SubscriberInitExt;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("vsphere_collector=debug"));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok(); // Ignore error if already initialized
    });
}
