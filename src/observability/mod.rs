//! Logging and span export setup.
//!
//! Provides:
//! - Structured console logging via `tracing-subscriber`
//! - OTLP span export through a global OpenTelemetry tracer provider

pub mod otel;
pub mod tracing;

pub use otel::{init_telemetry, TelemetryGuard};
pub use self::tracing::{init_test_tracing, init_tracing};
