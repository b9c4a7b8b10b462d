//! OpenTelemetry-backed sink.
//!
//! Spans are started from a named tracer and activated through
//! `Context::attach`, so nested spans (from this crate or any other
//! OpenTelemetry instrumentation) become children of the current call.

use std::borrow::Cow;
use std::fmt;

use opentelemetry::global::{self, BoxedTracer};
use opentelemetry::trace::{SpanKind, TraceContextExt, Tracer};
use opentelemetry::{Context, ContextGuard, KeyValue};

use super::{Exception, SinkSpan, SpanAttributes, TraceSink};

/// Sink that creates spans with an OpenTelemetry [`Tracer`].
pub struct OtelSink<T = BoxedTracer> {
    tracer: T,
}

impl OtelSink<BoxedTracer> {
    /// Use a tracer from the globally installed tracer provider.
    pub fn global(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            tracer: global::tracer(name),
        }
    }
}

impl<T> OtelSink<T> {
    pub fn new(tracer: T) -> Self {
        Self { tracer }
    }

    pub fn tracer(&self) -> &T {
        &self.tracer
    }
}

impl<T> fmt::Debug for OtelSink<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtelSink").finish_non_exhaustive()
    }
}

impl<T> TraceSink for OtelSink<T>
where
    T: Tracer + Send + Sync,
    T::Span: Send + Sync + 'static,
{
    type Span = OtelSpan;

    fn start_span(&self, name: String, kind: SpanKind) -> OtelSpan {
        let span = self
            .tracer
            .span_builder(name)
            .with_kind(kind)
            .start(&self.tracer);
        OtelSpan {
            cx: Context::current_with_span(span),
        }
    }
}

/// Span handle carrying the context the span lives in.
#[derive(Debug)]
pub struct OtelSpan {
    cx: Context,
}

impl OtelSpan {
    pub fn context(&self) -> &Context {
        &self.cx
    }
}

impl SpanAttributes for OtelSpan {
    fn set_attribute(&self, attribute: KeyValue) {
        self.cx.span().set_attribute(attribute);
    }

    fn record_exception(&self, exception: &Exception) {
        let mut attributes = vec![
            KeyValue::new("exception.type", exception.kind().to_string()),
            KeyValue::new("exception.message", exception.message().to_string()),
        ];
        if let Some(stacktrace) = exception.stacktrace() {
            attributes.push(KeyValue::new("exception.stacktrace", stacktrace.to_string()));
        }
        self.cx.span().add_event("exception", attributes);
    }
}

impl SinkSpan for OtelSpan {
    type Active = ContextGuard;

    fn activate(&self) -> ContextGuard {
        self.cx.clone().attach()
    }

    fn end(self) {
        self.cx.span().end();
    }
}
