//! Error types for telemetry setup.
//!
//! Intercepted calls never produce these: their own errors pass through
//! untouched.

use thiserror::Error;

/// Failures while installing logging or span export.
#[derive(Debug, Error)]
pub enum SpanwrapError {
    /// A global subscriber was already set, or the filter was rejected.
    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),

    /// Invalid `RUST_LOG`-style filter directive.
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    /// The OTLP exporter or tracer provider could not be built.
    #[error("failed to build span exporter: {0}")]
    Exporter(#[from] opentelemetry::trace::TraceError),
}

pub type Result<T> = std::result::Result<T, SpanwrapError>;
