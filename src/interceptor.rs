//! Call interceptor.
//!
//! Wraps an eligible call in a span:
//! 1. skip straight to the call for synthetic call-sites (line 0) or when
//!    tracing is switched off
//! 2. start an internal span named after the full signature and make it current
//! 3. run the call
//! 4. on success tag `srcCodeLine` and `fqClass`, then run the success hook
//!    while the span is still current
//! 5. on failure release the span, run the failure hook, then record the
//!    exception
//! 6. end the span, whatever happened above
//!
//! The call's own value, error or panic payload always reaches the caller
//! unchanged. Panics raised by hooks are logged and dropped.

use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::mem::ManuallyDrop;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use opentelemetry::trace::SpanKind;
use opentelemetry::KeyValue;
use tracing::{trace, warn};

use crate::callsite::{CallSite, MethodSignature, SourceLocation};
use crate::hooks::{CallError, Concrete, Failure, FailureHook, NoopHook, SuccessHook};
use crate::matcher::{Matcher, DEFAULT_ROOT_NAMESPACE};
use crate::sink::{panic_message, SinkSpan, SpanAttributes, TraceSink};

/// Attribute holding the source line of the call, minus one.
pub const SRC_CODE_LINE: &str = "srcCodeLine";
/// Attribute holding the fully-qualified declaring type.
pub const FQ_CLASS: &str = "fqClass";

/// Construction-time settings of an [`Interceptor`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptorConfig {
    /// Disable span creation entirely.
    pub skip_tracing: bool,
    /// Only methods declared under this module path are wrapped.
    pub root_namespace: String,
}

impl Default for InterceptorConfig {
    fn default() -> Self {
        Self {
            skip_tracing: false,
            root_namespace: DEFAULT_ROOT_NAMESPACE.to_string(),
        }
    }
}

/// Ends the span when dropped, including during unwinding.
struct SpanScope<S: SinkSpan> {
    span: ManuallyDrop<S>,
}

impl<S: SinkSpan> SpanScope<S> {
    fn new(span: S) -> Self {
        Self {
            span: ManuallyDrop::new(span),
        }
    }

    fn span(&self) -> &S {
        &self.span
    }
}

impl<S: SinkSpan> Drop for SpanScope<S> {
    fn drop(&mut self) {
        // SAFETY: the span is taken exactly once, here, and not touched afterwards.
        let span = unsafe { ManuallyDrop::take(&mut self.span) };
        span.end();
    }
}

type Activation<S> = <<S as TraceSink>::Span as SinkSpan>::Active;

/// Wraps calls in spans on a [`TraceSink`].
#[derive(Debug)]
pub struct Interceptor<S> {
    sink: S,
    matcher: Matcher,
    skip_tracing: bool,
    on_success: Arc<dyn SuccessHook>,
    on_failure: Arc<dyn FailureHook>,
}

impl<S: TraceSink> Interceptor<S> {
    pub fn new(sink: S, config: &InterceptorConfig) -> Self {
        Self {
            sink,
            matcher: Matcher::new(config.root_namespace.as_str()),
            skip_tracing: config.skip_tracing,
            on_success: Arc::new(NoopHook),
            on_failure: Arc::new(NoopHook),
        }
    }

    /// Replace the success hook.
    #[must_use]
    pub fn with_success_hook(mut self, hook: impl SuccessHook + 'static) -> Self {
        self.on_success = Arc::new(hook);
        self
    }

    /// Replace the failure hook.
    #[must_use]
    pub fn with_failure_hook(mut self, hook: impl FailureHook + 'static) -> Self {
        self.on_failure = Arc::new(hook);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn skip_tracing(&self) -> bool {
        self.skip_tracing
    }

    /// Whether calls to `signature` are wrapped at all.
    pub fn is_eligible(&self, signature: &MethodSignature) -> bool {
        self.matcher.matches(signature)
    }

    /// Whether this particular invocation gets a span.
    pub fn should_trace(&self, site: &CallSite<'_>) -> bool {
        if site.location().is_synthetic() {
            trace!(signature = site.signature().name, "synthetic call-site, not tracing");
            return false;
        }
        if self.skip_tracing {
            trace!(signature = site.signature().name, "tracing switched off");
            return false;
        }
        self.is_eligible(site.signature())
    }

    /// Evaluate eligibility once and return a handle for repeated calls.
    pub fn bind(&self, signature: &'static MethodSignature) -> BoundCall<'_, S> {
        BoundCall {
            interceptor: self,
            signature,
            eligible: self.is_eligible(signature),
        }
    }

    /// Run `call`, wrapped in a span if the call-site qualifies.
    ///
    /// `E` is any [`CallError`]: a concrete error type, a boxed
    /// `dyn Error + Send + Sync` or `anyhow::Error`.
    pub fn intercept<T, E, M, F>(&self, site: &CallSite<'_>, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: fmt::Debug,
        E: CallError<M>,
    {
        if !self.should_trace(site) {
            return call();
        }
        self.traced::<T, E, M, F>(site, call)
    }

    /// [`intercept`](Self::intercept) for calls that cannot fail.
    pub fn intercept_infallible<T, F>(&self, site: &CallSite<'_>, call: F) -> T
    where
        F: FnOnce() -> T,
        T: fmt::Debug,
    {
        match self.intercept::<T, std::convert::Infallible, Concrete, _>(site, || Ok(call())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Wrap a future. The span is current only while the future is being polled.
    pub fn intercept_async<'a, T, E, M, Fut>(&'a self, site: CallSite<'a>, future: Fut) -> Traced<'a, S, Fut, M>
    where
        Fut: Future<Output = Result<T, E>>,
        T: fmt::Debug,
        E: CallError<M>,
    {
        let scope = self.should_trace(&site).then(|| self.start(&site));
        Traced {
            interceptor: self,
            site,
            scope,
            future: Box::pin(future),
            marker: PhantomData,
        }
    }

    fn start(&self, site: &CallSite<'_>) -> SpanScope<S::Span> {
        SpanScope::new(self.sink.start_span(site.span_name(), SpanKind::Internal))
    }

    fn traced<T, E, M, F>(&self, site: &CallSite<'_>, call: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: fmt::Debug,
        E: CallError<M>,
    {
        let scope = self.start(site);
        let active = scope.span().activate();

        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(result) => self.settle::<T, E, M>(scope.span(), site, result, active),
            Err(payload) => {
                drop(active);
                self.settle_panic(scope.span(), site, &*payload);
                drop(scope);
                panic::resume_unwind(payload)
            }
        }
    }

    /// `active` is released after the success hook, or before the failure hook.
    fn settle<T, E, M>(
        &self,
        span: &S::Span,
        site: &CallSite<'_>,
        result: Result<T, E>,
        active: Activation<S>,
    ) -> Result<T, E>
    where
        T: fmt::Debug,
        E: CallError<M>,
    {
        match result {
            Ok(value) => {
                span.set_attribute(KeyValue::new(SRC_CODE_LINE, i64::from(site.line()) - 1));
                span.set_attribute(KeyValue::new(FQ_CLASS, site.signature().declaring_type()));
                self.run_hook("success", site, || self.on_success.on_success(span, site, &value));
                drop(active);
                Ok(value)
            }
            Err(error) => {
                drop(active);
                self.fail(span, site, &Failure::error::<E, M>(&error));
                Err(error)
            }
        }
    }

    fn settle_panic(&self, span: &S::Span, site: &CallSite<'_>, payload: &(dyn std::any::Any + Send)) {
        let message = panic_message(payload);
        self.fail(span, site, &Failure::Panic { message: &message });
    }

    fn fail(&self, span: &S::Span, site: &CallSite<'_>, failure: &Failure<'_>) {
        self.run_hook("failure", site, || self.on_failure.on_failure(span, site, failure));
        span.record_exception(&failure.to_exception());
    }

    fn run_hook(&self, hook: &'static str, site: &CallSite<'_>, run: impl FnOnce()) {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(run)) {
            warn!(
                hook,
                signature = site.signature().name,
                panic = %panic_message(&*payload),
                "interception hook panicked, keeping the call's own outcome"
            );
        }
    }
}

/// Eligibility of one signature, evaluated once.
pub struct BoundCall<'i, S> {
    interceptor: &'i Interceptor<S>,
    signature: &'static MethodSignature,
    eligible: bool,
}

impl<S> fmt::Debug for BoundCall<'_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundCall")
            .field("signature", &self.signature.long_string())
            .field("eligible", &self.eligible)
            .finish_non_exhaustive()
    }
}

impl<S: TraceSink> BoundCall<'_, S> {
    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    pub fn signature(&self) -> &'static MethodSignature {
        self.signature
    }

    /// Invoke through the interceptor. Ineligible signatures run the call directly.
    pub fn call<T, E, M, F>(
        &self,
        location: SourceLocation,
        args: &[&(dyn fmt::Debug + Sync)],
        call: F,
    ) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        T: fmt::Debug,
        E: CallError<M>,
    {
        if !self.eligible {
            return call();
        }
        let site = CallSite::new(self.signature, location).with_args(args);
        if !self.interceptor.should_trace(&site) {
            return call();
        }
        self.interceptor.traced::<T, E, M, F>(&site, call)
    }
}

/// Future returned by [`Interceptor::intercept_async`].
#[must_use = "futures do nothing unless polled"]
pub struct Traced<'a, S: TraceSink, Fut, M = Concrete> {
    interceptor: &'a Interceptor<S>,
    site: CallSite<'a>,
    scope: Option<SpanScope<S::Span>>,
    future: Pin<Box<Fut>>,
    marker: PhantomData<fn() -> M>,
}

// Fields are never pinned: the inner future is boxed.
impl<S: TraceSink, Fut, M> Unpin for Traced<'_, S, Fut, M> {}

impl<S: TraceSink, Fut, M> fmt::Debug for Traced<'_, S, Fut, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Traced")
            .field("site", &self.site)
            .field("traced", &self.scope.is_some())
            .finish_non_exhaustive()
    }
}

impl<S, Fut, T, E, M> Future for Traced<'_, S, Fut, M>
where
    S: TraceSink,
    Fut: Future<Output = Result<T, E>>,
    T: fmt::Debug,
    E: CallError<M>,
{
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let Some(scope) = this.scope.take() else {
            return this.future.as_mut().poll(cx);
        };

        let active = scope.span().activate();
        let polled = panic::catch_unwind(AssertUnwindSafe(|| this.future.as_mut().poll(cx)));

        match polled {
            Ok(Poll::Pending) => {
                drop(active);
                this.scope = Some(scope);
                Poll::Pending
            }
            Ok(Poll::Ready(result)) => {
                Poll::Ready(this.interceptor.settle::<T, E, M>(scope.span(), &this.site, result, active))
            }
            Err(payload) => {
                drop(active);
                this.interceptor.settle_panic(scope.span(), &this.site, &*payload);
                drop(scope);
                panic::resume_unwind(payload)
            }
        }
    }
}
