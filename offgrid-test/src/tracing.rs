//! Capture of offgrid spans and log events for scenario assertions.

use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record};
use tracing::{Dispatch, Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

/// A span opened by one of the offgrid crates.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub id: u64,
    pub name: &'static str,
    pub fields: Vec<(&'static str, String)>,
}

impl CapturedSpan {
    fn set(&mut self, name: &'static str, value: String) {
        match self.fields.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A log event emitted by one of the offgrid crates.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub message: String,
    /// Name of the innermost offgrid span the event was emitted in.
    pub span: Option<&'static str>,
}

#[derive(Debug, Default)]
struct Captured {
    spans: Vec<CapturedSpan>,
    events: Vec<CapturedEvent>,
}

#[derive(Default)]
struct Fields {
    values: Vec<(&'static str, String)>,
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.values.push((field.name(), value.to_owned()));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.values.push((field.name(), format!("{value:?}")));
    }
}

fn from_offgrid(target: &str) -> bool {
    target.starts_with("offgrid")
}

/// Layer recording offgrid spans and events into shared storage.
pub struct CaptureLayer {
    captured: Arc<Mutex<Captured>>,
}

impl<S> Layer<S> for CaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, _ctx: Context<'_, S>) {
        let metadata = attrs.metadata();
        if !from_offgrid(metadata.target()) {
            return;
        }
        let mut fields = Fields::default();
        attrs.record(&mut fields);
        self.captured.lock().unwrap().spans.push(CapturedSpan {
            id: id.into_u64(),
            name: metadata.name(),
            fields: fields.values,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        values.record(&mut fields);
        let mut captured = self.captured.lock().unwrap();
        if let Some(span) = captured.spans.iter_mut().find(|s| s.id == id.into_u64()) {
            for (name, value) in fields.values {
                span.set(name, value);
            }
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if !from_offgrid(metadata.target()) {
            return;
        }
        let mut fields = Fields::default();
        event.record(&mut fields);
        let message = fields
            .values
            .into_iter()
            .find(|(name, _)| *name == "message")
            .map(|(_, value)| value)
            .unwrap_or_default();
        let span = ctx
            .event_scope(event)
            .and_then(|mut scope| scope.find(|span| from_offgrid(span.metadata().target())))
            .map(|span| span.metadata().name());
        self.captured.lock().unwrap().events.push(CapturedEvent {
            level: *metadata.level(),
            message,
            span,
        });
    }
}

/// Handle on everything a [`CaptureLayer`] recorded.
///
/// Instrument futures with [`SpanCollector::dispatch`] to capture only what
/// one scenario emits.
#[derive(Clone)]
pub struct SpanCollector {
    captured: Arc<Mutex<Captured>>,
    dispatch: Dispatch,
}

impl fmt::Debug for SpanCollector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let captured = self.captured.lock().unwrap();
        f.debug_struct("SpanCollector")
            .field("spans", &captured.spans.len())
            .field("events", &captured.events.len())
            .finish()
    }
}

/// A collector with its own registry-based dispatch.
pub fn create_span_collector() -> SpanCollector {
    let captured = Arc::new(Mutex::new(Captured::default()));
    let layer = CaptureLayer {
        captured: Arc::clone(&captured),
    };
    SpanCollector {
        captured,
        dispatch: Dispatch::new(Registry::default().with(layer)),
    }
}

impl SpanCollector {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Names of every captured span, oldest first.
    pub fn span_names(&self) -> Vec<String> {
        let captured = self.captured.lock().unwrap();
        captured.spans.iter().map(|s| s.name.to_owned()).collect()
    }

    /// Field of the most recent span called `span`.
    pub fn get_field(&self, span: &str, field: &str) -> Option<String> {
        let captured = self.captured.lock().unwrap();
        captured
            .spans
            .iter()
            .rev()
            .find(|s| s.name == span)
            .and_then(|s| s.field(field))
            .map(str::to_owned)
    }

    /// Events at `level` or more severe.
    pub fn events_at_least(&self, level: Level) -> Vec<CapturedEvent> {
        let captured = self.captured.lock().unwrap();
        captured
            .events
            .iter()
            .filter(|event| event.level <= level)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        let mut captured = self.captured.lock().unwrap();
        captured.spans.clear();
        captured.events.clear();
    }
}
