//! Tracing sink contract.
//!
//! The interceptor only needs to start a span, tag it, record failures on it,
//! activate it for the duration of a call and end it. Implementations:
//! - [`OtelSink`]: OpenTelemetry tracer (global provider or any `Tracer`)
//! - [`TracingSink`]: `tracing` spans, exported through `tracing-opentelemetry`
//! - [`MemorySink`]: records every interaction, for tests

pub mod memory;
pub mod otel;
pub mod subscriber;

use std::any::Any;
use std::error::Error;
use std::fmt;

pub use opentelemetry::trace::SpanKind;
pub use opentelemetry::KeyValue;

pub use memory::{MemorySink, MemorySpan, RecordedSpan, SinkEvent};
pub use otel::{OtelSink, OtelSpan};
pub use subscriber::{TracingSink, TracingSpan};

/// Mutations available on a started span.
///
/// This is the object-safe part of a sink span; hooks receive it as
/// `&dyn SpanAttributes`.
pub trait SpanAttributes {
    fn set_attribute(&self, attribute: KeyValue);

    fn record_exception(&self, exception: &Exception);
}

/// A span handle produced by a [`TraceSink`].
pub trait SinkSpan: SpanAttributes + Send {
    /// Guard that keeps the span current; dropping it restores the previous one.
    type Active;

    fn activate(&self) -> Self::Active;

    /// Close the span. Consumes the handle, so a span ends at most once.
    fn end(self);
}

/// Receiver of span data.
pub trait TraceSink: Send + Sync {
    type Span: SinkSpan;

    /// Start a span as a child of whatever span is current.
    fn start_span(&self, name: String, kind: SpanKind) -> Self::Span;
}

/// Failure details recorded on a span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exception {
    kind: String,
    message: String,
    stacktrace: Option<String>,
}

/// `kind` of exceptions recorded for panics.
pub const PANIC_KIND: &str = "panic";

impl Exception {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stacktrace: None,
        }
    }

    /// Build from an error value. The `source()` chain becomes the stacktrace.
    pub fn from_error(kind: &str, error: &(dyn Error + 'static)) -> Self {
        let mut causes = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self {
            kind: kind.to_string(),
            message: error.to_string(),
            stacktrace: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }

    /// Build from a panic message.
    pub fn from_panic(message: &str) -> Self {
        Self::new(PANIC_KIND, message)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_string()
    }
}
