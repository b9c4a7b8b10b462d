//! spanwrap: wraps method calls in OpenTelemetry spans.
//!
//! An [`Interceptor`] decides per call-site whether to trace, opens an
//! internal span named after the full method signature, tags it with the
//! source line and declaring type, records failures, and always closes it.
//! The wrapped call's value, error or panic reaches the caller unchanged.
//!
//! # Modules
//!
//! - [`callsite`]: Method signatures, source locations, the `call_site!` macro
//! - [`matcher`]: Which methods are eligible
//! - [`sink`]: Span sink contract and its OpenTelemetry, `tracing` and in-memory implementations
//! - [`hooks`]: Success/failure strategies
//! - [`interceptor`]: Skip decision and span lifecycle
//! - [`config`]: CLI and environment configuration
//! - [`observability`]: Logging and OTLP export setup
//!
//! # Example
//!
//! ```
//! use spanwrap::{call_site, Interceptor, InterceptorConfig, MemorySink, MethodSignature};
//!
//! static CHECKOUT: MethodSignature =
//!     MethodSignature::new("ru::shop", Some("Cart"), "checkout").returning("u64");
//!
//! let sink = MemorySink::new();
//! let interceptor = Interceptor::new(sink.clone(), &InterceptorConfig::default());
//!
//! let total = interceptor.intercept_infallible(&call_site!(CHECKOUT), || 120u64);
//! assert_eq!(total, 120);
//! assert_eq!(sink.spans().len(), 1);
//! ```

// Lint configuration
#![warn(clippy::all)]
#![allow(
    clippy::module_name_repetitions, // sink::memory::MemorySink is fine
    clippy::must_use_candidate,      // Not all functions need #[must_use]
    clippy::missing_errors_doc,      // Error docs can be verbose
    clippy::missing_panics_doc       // Panic docs can be verbose
)]

pub mod callsite;
pub mod config;
pub mod error;
pub mod hooks;
pub mod interceptor;
pub mod matcher;
pub mod observability;
pub mod sink;

pub use callsite::{CallSite, MethodSignature, Parameter, Receiver, SourceLocation, Visibility};
pub use config::{LogFormat, TraceConfig};
pub use error::{Result, SpanwrapError};
pub use hooks::{
    CallError, Concrete, Dynamic, Failure, FailureHook, NoopHook, RecordArguments, SuccessHook,
};
pub use interceptor::{BoundCall, Interceptor, InterceptorConfig, Traced, FQ_CLASS, SRC_CODE_LINE};
pub use matcher::{Matcher, DEFAULT_ROOT_NAMESPACE};
pub use sink::{
    Exception, MemorySink, OtelSink, SinkSpan, SpanAttributes, SpanKind, TraceSink, TracingSink,
};
