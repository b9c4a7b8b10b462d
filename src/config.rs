//! Configuration parsing for spanwrap.
//!
//! Supports:
//! - CLI arguments via clap
//! - Environment variable overrides (`SKIP_TRACING`, `OTEL_*`, `RUST_LOG`)
//! - Sensible defaults for quick start

use clap::{Parser, ValueEnum};

use crate::interceptor::InterceptorConfig;
use crate::matcher::DEFAULT_ROOT_NAMESPACE;

/// Console log output format.
#[derive(ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per record
    Json,
}

/// spanwrap: wrap method calls in OpenTelemetry spans.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "spanwrap")]
#[command(author, version, about, long_about = None)]
pub struct TraceConfig {
    /// Disable span creation for every intercepted call
    #[arg(long, env = "SKIP_TRACING")]
    pub skip_tracing: bool,

    /// Only methods declared under this module path are traced
    #[arg(long, env = "SPANWRAP_ROOT_NAMESPACE", default_value = DEFAULT_ROOT_NAMESPACE)]
    pub root_namespace: String,

    /// Name of the tracer spans are created with
    #[arg(long, env = "SPANWRAP_TRACER_NAME", default_value = "spanwrap")]
    pub tracer_name: String,

    /// Service name reported to the collector
    #[arg(long, env = "OTEL_SERVICE_NAME", default_value = "spanwrap")]
    pub service_name: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,

    /// Console log format
    #[arg(long, env = "SPANWRAP_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// OpenTelemetry collector endpoint for span export (optional)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,
}

impl TraceConfig {
    /// Parse configuration from CLI arguments and environment.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Settings the interceptor is constructed with.
    pub fn interceptor_config(&self) -> InterceptorConfig {
        InterceptorConfig {
            skip_tracing: self.skip_tracing,
            root_namespace: self.root_namespace.clone(),
        }
    }
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            skip_tracing: false,
            root_namespace: DEFAULT_ROOT_NAMESPACE.into(),
            tracer_name: "spanwrap".into(),
            service_name: "spanwrap".into(),
            log_level: "info".into(),
            log_format: LogFormat::Text,
            otel_endpoint: None,
        }
    }
}
