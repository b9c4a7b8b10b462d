//! Console logging setup.
//!
//! Configures structured logging with:
//! - Environment-based filter (via `RUST_LOG`, falling back to the given level)
//! - Target, thread ids, file and line on every record
//! - Text or JSON output

use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LogFormat;
use crate::error::Result;

/// Build the filter from `RUST_LOG`, or `log_level` when unset.
pub(crate) fn env_filter(log_level: &str) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(log_level)?),
    }
}

/// Console layer shared by every setup path.
pub(crate) fn fmt_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match format {
        LogFormat::Text => layer.boxed(),
        LogFormat::Json => layer.json().boxed(),
    }
}

/// Initialize console logging.
///
/// Fails if a global subscriber is already installed.
///
/// # Arguments
///
/// * `log_level` - Filter used when `RUST_LOG` is not set
/// * `format` - Text or JSON console output
pub fn init_tracing(log_level: &str, format: LogFormat) -> Result<()> {
    tracing_subscriber::registry()
        .with(env_filter(log_level)?)
        .with(fmt_layer(format))
        .try_init()?;

    tracing::info!(log_level, ?format, "Tracing initialized");
    Ok(())
}

/// Initialize tracing for tests (only logs errors).
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("error")
        .with_test_writer()
        .try_init();
}
