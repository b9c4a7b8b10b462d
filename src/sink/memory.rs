//! In-memory sink that records every interaction.
//!
//! Useful in tests: clones share the same log, so a test can keep one handle
//! while the interceptor owns another.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, ThreadId};

use opentelemetry::trace::SpanKind;
use opentelemetry::{KeyValue, Value};

use super::{Exception, SinkSpan, SpanAttributes, TraceSink};

/// One recorded sink interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Started { id: u64, name: String, kind: SpanKind },
    Activated { id: u64 },
    Deactivated { id: u64 },
    Attribute { id: u64, attribute: KeyValue },
    Exception { id: u64, exception: Exception },
    Ended { id: u64 },
}

impl SinkEvent {
    pub fn span_id(&self) -> u64 {
        match self {
            Self::Started { id, .. }
            | Self::Activated { id }
            | Self::Deactivated { id }
            | Self::Attribute { id, .. }
            | Self::Exception { id, .. }
            | Self::Ended { id } => *id,
        }
    }
}

/// Aggregated view of one span.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    pub id: u64,
    pub name: String,
    pub kind: SpanKind,
    pub attributes: Vec<KeyValue>,
    pub exceptions: Vec<Exception>,
    pub end_count: usize,
}

impl RecordedSpan {
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes
            .iter()
            .rev()
            .find(|attribute| attribute.key.as_str() == key)
            .map(|attribute| &attribute.value)
    }

    pub fn is_ended(&self) -> bool {
        self.end_count > 0
    }
}

#[derive(Debug, Default)]
struct Inner {
    next_id: AtomicU64,
    events: Mutex<Vec<SinkEvent>>,
    /// Activation stack across all threads, in push order.
    active: Mutex<Vec<(ThreadId, u64)>>,
}

impl Inner {
    fn events(&self) -> MutexGuard<'_, Vec<SinkEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn active(&self) -> MutexGuard<'_, Vec<(ThreadId, u64)>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, event: SinkEvent) {
        self.events().push(event);
    }
}

/// Sink that keeps every event in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    inner: Arc<Inner>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events in the order they happened.
    pub fn events(&self) -> Vec<SinkEvent> {
        self.inner.events().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.events().is_empty()
    }

    pub fn started_count(&self) -> usize {
        self.count(|event| matches!(event, SinkEvent::Started { .. }))
    }

    pub fn ended_count(&self) -> usize {
        self.count(|event| matches!(event, SinkEvent::Ended { .. }))
    }

    fn count(&self, predicate: impl Fn(&SinkEvent) -> bool) -> usize {
        self.inner.events().iter().filter(|event| predicate(event)).count()
    }

    /// Spans in start order, with their attributes and exceptions folded in.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        let events = self.inner.events();
        let mut spans: Vec<RecordedSpan> = Vec::new();
        for event in events.iter() {
            if let SinkEvent::Started { id, name, kind } = event {
                spans.push(RecordedSpan {
                    id: *id,
                    name: name.clone(),
                    kind: kind.clone(),
                    attributes: Vec::new(),
                    exceptions: Vec::new(),
                    end_count: 0,
                });
                continue;
            }
            let Some(span) = spans.iter_mut().find(|span| span.id == event.span_id()) else {
                continue;
            };
            match event {
                SinkEvent::Attribute { attribute, .. } => span.attributes.push(attribute.clone()),
                SinkEvent::Exception { exception, .. } => span.exceptions.push(exception.clone()),
                SinkEvent::Ended { .. } => span.end_count += 1,
                _ => {}
            }
        }
        spans
    }

    /// The span active on the calling thread, if any.
    pub fn current_span(&self) -> Option<u64> {
        let me = thread::current().id();
        self.inner
            .active()
            .iter()
            .rev()
            .find(|(thread, _)| *thread == me)
            .map(|(_, id)| *id)
    }

    pub fn clear(&self) {
        self.inner.events().clear();
    }
}

impl TraceSink for MemorySink {
    type Span = MemorySpan;

    fn start_span(&self, name: String, kind: SpanKind) -> MemorySpan {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.push(SinkEvent::Started { id, name, kind });
        MemorySpan {
            id,
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Span handle of a [`MemorySink`].
#[derive(Debug)]
pub struct MemorySpan {
    id: u64,
    inner: Arc<Inner>,
}

impl MemorySpan {
    pub fn id(&self) -> u64 {
        self.id
    }
}

impl SpanAttributes for MemorySpan {
    fn set_attribute(&self, attribute: KeyValue) {
        self.inner.push(SinkEvent::Attribute {
            id: self.id,
            attribute,
        });
    }

    fn record_exception(&self, exception: &Exception) {
        self.inner.push(SinkEvent::Exception {
            id: self.id,
            exception: exception.clone(),
        });
    }
}

impl SinkSpan for MemorySpan {
    type Active = MemoryActivation;

    fn activate(&self) -> MemoryActivation {
        self.inner.active().push((thread::current().id(), self.id));
        self.inner.push(SinkEvent::Activated { id: self.id });
        MemoryActivation {
            id: self.id,
            thread: thread::current().id(),
            inner: Arc::clone(&self.inner),
        }
    }

    fn end(self) {
        self.inner.push(SinkEvent::Ended { id: self.id });
    }
}

/// Activation guard of a [`MemorySpan`].
#[derive(Debug)]
pub struct MemoryActivation {
    id: u64,
    thread: ThreadId,
    inner: Arc<Inner>,
}

impl Drop for MemoryActivation {
    fn drop(&mut self) {
        {
            let mut active = self.inner.active();
            if let Some(pos) = active
                .iter()
                .rposition(|entry| *entry == (self.thread, self.id))
            {
                active.remove(pos);
            }
        }
        self.inner.push(SinkEvent::Deactivated { id: self.id });
    }
}
