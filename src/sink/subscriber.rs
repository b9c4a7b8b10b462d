//! `tracing`-backed sink.
//!
//! Each intercepted call becomes an `info`-level `tracing` span. The
//! `otel.name` and `otel.kind` fields are understood by `tracing-opentelemetry`,
//! so with an OpenTelemetry layer installed the exported span carries the full
//! signature as its name. Exceptions are emitted as `error!` events inside
//! the span.

use opentelemetry::trace::SpanKind;
use opentelemetry::{KeyValue, Value};
use tracing::field;
use tracing::span::EnteredSpan;
use tracing::Span;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::{Exception, SinkSpan, SpanAttributes, TraceSink};
use crate::interceptor::{FQ_CLASS, SRC_CODE_LINE};

/// Sink that opens `tracing` spans.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

fn kind_name(kind: &SpanKind) -> &'static str {
    match kind {
        SpanKind::Client => "client",
        SpanKind::Server => "server",
        SpanKind::Producer => "producer",
        SpanKind::Consumer => "consumer",
        SpanKind::Internal => "internal",
    }
}

impl TraceSink for TracingSink {
    type Span = TracingSpan;

    fn start_span(&self, name: String, kind: SpanKind) -> TracingSpan {
        let span = tracing::info_span!(
            "spanwrap.call",
            otel.name = %name,
            otel.kind = kind_name(&kind),
            srcCodeLine = field::Empty,
            fqClass = field::Empty,
        );
        TracingSpan { span }
    }
}

/// Handle to a `tracing` span.
#[derive(Debug)]
pub struct TracingSpan {
    span: Span,
}

impl TracingSpan {
    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl SpanAttributes for TracingSpan {
    fn set_attribute(&self, attribute: KeyValue) {
        let key = attribute.key.as_str();
        // Declared fields show up in log output too; everything else goes
        // straight to the OpenTelemetry span.
        if key == SRC_CODE_LINE || key == FQ_CLASS {
            match &attribute.value {
                Value::I64(value) => {
                    self.span.record(key, *value);
                }
                Value::F64(value) => {
                    self.span.record(key, *value);
                }
                Value::Bool(value) => {
                    self.span.record(key, *value);
                }
                other => {
                    self.span.record(key, field::display(other.as_str()));
                }
            }
        } else {
            self.span.set_attribute(attribute.key, attribute.value);
        }
    }

    fn record_exception(&self, exception: &Exception) {
        tracing::error!(
            parent: &self.span,
            error.kind = exception.kind(),
            error.message = exception.message(),
            error.stacktrace = exception.stacktrace(),
            "{exception}"
        );
    }
}

impl SinkSpan for TracingSpan {
    type Active = EnteredSpan;

    fn activate(&self) -> EnteredSpan {
        self.span.clone().entered()
    }

    fn end(self) {
        drop(self.span);
    }
}
