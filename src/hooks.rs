//! Pluggable success/failure strategies.
//!
//! The interceptor calls [`SuccessHook::on_success`] after every successful
//! traced call, while the span is still current, and [`FailureHook::on_failure`]
//! after every failed one, once the span is no longer current. In both cases the
//! span has not ended yet. The defaults do nothing; [`RecordArguments`] tags
//! arguments and the result value.
//!
//! Errors reach the failure path through [`CallError`], which covers concrete
//! error types as well as boxed trait objects and `anyhow::Error`.

use std::error::Error;
use std::fmt;

use opentelemetry::KeyValue;

use crate::callsite::CallSite;
use crate::sink::{Exception, SpanAttributes};

/// An error a wrapped call can return.
///
/// The marker parameter keeps the two blanket impls apart and is inferred at
/// the call site:
/// - [`Concrete`]: any `E: Error + 'static`
/// - [`Dynamic`]: anything that derefs to `dyn Error + Send + Sync`, such as
///   `Box<dyn Error + Send + Sync>` or `anyhow::Error`
pub trait CallError<Marker> {
    fn as_error(&self) -> &(dyn Error + 'static);

    /// Name recorded as the exception type.
    fn type_name(&self) -> &'static str;
}

/// Marker for error types implementing [`Error`] themselves.
#[derive(Debug)]
pub enum Concrete {}

/// Marker for type-erased errors.
#[derive(Debug)]
pub enum Dynamic {}

impl<E: Error + 'static> CallError<Concrete> for E {
    fn as_error(&self) -> &(dyn Error + 'static) {
        self
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}

impl<E: AsRef<dyn Error + Send + Sync + 'static>> CallError<Dynamic> for E {
    fn as_error(&self) -> &(dyn Error + 'static) {
        self.as_ref()
    }

    fn type_name(&self) -> &'static str {
        std::any::type_name::<E>()
    }
}

/// Called with the span and result of a successful call.
pub trait SuccessHook: fmt::Debug + Send + Sync {
    fn on_success(&self, span: &dyn SpanAttributes, site: &CallSite<'_>, result: &dyn fmt::Debug);
}

/// Called with the span and failure of a failed call, before the failure is recorded.
pub trait FailureHook: fmt::Debug + Send + Sync {
    fn on_failure(&self, span: &dyn SpanAttributes, site: &CallSite<'_>, failure: &Failure<'_>);
}

/// How a traced call failed.
#[derive(Debug, Clone, Copy)]
pub enum Failure<'a> {
    /// The call returned `Err`.
    Error {
        error: &'a (dyn Error + 'static),
        type_name: &'static str,
    },
    /// The call panicked.
    Panic { message: &'a str },
}

impl<'a> Failure<'a> {
    pub fn error<E: CallError<M>, M>(error: &'a E) -> Self {
        Self::Error {
            error: error.as_error(),
            type_name: error.type_name(),
        }
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panic { .. })
    }

    pub fn to_exception(&self) -> Exception {
        match self {
            Self::Error { error, type_name } => Exception::from_error(type_name, *error),
            Self::Panic { message } => Exception::from_panic(message),
        }
    }
}

impl fmt::Display for Failure<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error { error, .. } => write!(f, "{error}"),
            Self::Panic { message } => write!(f, "panicked: {message}"),
        }
    }
}

/// Hook that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHook;

impl SuccessHook for NoopHook {
    fn on_success(&self, _span: &dyn SpanAttributes, _site: &CallSite<'_>, _result: &dyn fmt::Debug) {}
}

impl FailureHook for NoopHook {
    fn on_failure(&self, _span: &dyn SpanAttributes, _site: &CallSite<'_>, _failure: &Failure<'_>) {}
}

/// Success hook that tags `arg: <name>` for every argument and `result` for
/// non-unit results, using their `Debug` rendering.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordArguments;

impl SuccessHook for RecordArguments {
    fn on_success(&self, span: &dyn SpanAttributes, site: &CallSite<'_>, result: &dyn fmt::Debug) {
        for (name, value) in site.arguments() {
            span.set_attribute(KeyValue::new(format!("arg: {name}"), format!("{value:?}")));
        }
        let rendered = format!("{result:?}");
        if rendered != "()" {
            span.set_attribute(KeyValue::new("result", rendered));
        }
    }
}
