use crate::handler::Handler;
use crate::level::Level;
use crate::record::{Record, Source};
use crate::value::{Attr, ErrorMessage, Value};
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id, Record as SpanRecord};
use tracing::subscriber::Interest;
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// `tracing_subscriber` layer that writes events through a [`Handler`].
///
/// Event fields become attributes and the `message` field the record's
/// message. Fields of enclosing spans are written as a group named after
/// the span, outermost first.
#[derive(Debug, Clone)]
pub struct HandlerLayer {
    handler: Handler,
}

impl HandlerLayer {
    pub fn new(handler: Handler) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }
}

/// Map a `tracing` level onto the handler's scale. `TRACE` sits four
/// steps below `DEBUG`.
pub fn level_from_tracing(level: &tracing::Level) -> Level {
    match *level {
        tracing::Level::TRACE => Level::DEBUG.offset(-4),
        tracing::Level::DEBUG => Level::DEBUG,
        tracing::Level::INFO => Level::INFO,
        tracing::Level::WARN => Level::WARN,
        tracing::Level::ERROR => Level::ERROR,
    }
}

/// Fields recorded on a span, kept in the span's extensions.
struct SpanAttrs(Vec<Attr>);

impl<S> Layer<S> for HandlerLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    // The minimum level can change at runtime, so no callsite is cached
    // as always or never interesting.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        // Spans are always let through so their fields are available to
        // the events inside them.
        metadata.is_span() || self.handler.enabled(level_from_tracing(metadata.level()))
    }

    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut fields = Vec::new();
        let mut message = None;
        attrs.record(&mut FieldVisitor { attrs: &mut fields, message: &mut message });
        if let Some(message) = message {
            fields.insert(0, Attr::string("message", message));
        }
        span.extensions_mut().insert(SpanAttrs(fields));
    }

    fn on_record(&self, id: &Id, values: &SpanRecord<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else { return };

        let mut extensions = span.extensions_mut();
        if let Some(SpanAttrs(fields)) = extensions.get_mut::<SpanAttrs>() {
            let mut message = None;
            values.record(&mut FieldVisitor { attrs: fields, message: &mut message });
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let meta = event.metadata();
        let level = level_from_tracing(meta.level());
        if !self.handler.enabled(level) {
            return;
        }

        let mut fields = Vec::new();
        let mut message: Option<String> = None;
        event.record(&mut FieldVisitor { attrs: &mut fields, message: &mut message });

        let mut record = Record::new(level, message.unwrap_or_default());
        if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
            record.source = Some(Source::new(file, line).with_function(meta.module_path()));
        }

        if let Some(scope) = ctx.event_scope(event) {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(SpanAttrs(attrs)) = extensions.get::<SpanAttrs>() {
                    if !attrs.is_empty() {
                        record.attrs.push(Attr::group(span.name(), attrs.clone()));
                    }
                }
            }
        }
        record.attrs.extend(fields);

        // Reporting through `tracing` would re-enter this layer.
        if let Err(e) = self.handler.handle(&record) {
            eprintln!("failed to write log record: {}", e);
        }
    }
}

/// Collects `tracing` fields as [`Attr`]s, pulling out `message`.
pub struct FieldVisitor<'a> {
    pub attrs: &'a mut Vec<Attr>,
    pub message: &'a mut Option<String>,
}

impl<'a> FieldVisitor<'a> {
    fn push(&mut self, field: &Field, value: Value) {
        self.attrs.push(Attr::new(field.name(), value));
    }
}

impl<'a> Visit for FieldVisitor<'a> {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            *self.message = Some(value.to_string());
        } else {
            self.push(field, Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.push(field, Value::Int64(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.push(field, Value::Uint64(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.push(field, Value::Float64(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.push(field, Value::Bool(value));
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.push(field, Value::Error(Arc::new(ErrorMessage(value.to_string()))));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            *self.message = Some(format!("{:?}", value));
        } else {
            self.push(field, Value::String(format!("{:?}", value)));
        }
    }
}
