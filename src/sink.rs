//! The log-sink seam consumed by the request-logging middleware.
//!
//! [`LogSink`] receives `(level, event, fields)` triples; the [`emit`] helper
//! merges the ambient context into the explicit per-call fields first, with
//! explicit fields winning ties. Sink failures are caught and discarded here:
//! serving the request always takes precedence over observability, so a
//! broken sink must never propagate into the request path.

use tracing::Level;

use crate::context::{self, FieldMap};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Destination for structured request events.
pub trait LogSink: Send + Sync {
    /// Emit one event. Implementations should contain their own failures;
    /// any error returned here is logged at debug level and dropped.
    fn emit(&self, level: Level, event: &str, fields: &FieldMap) -> Result<(), BoxError>;
}

/// Default sink: maps recognized field keys onto structured `tracing` event
/// fields. Unrecognized keys are folded into a single `extra` field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, level: Level, event: &str, fields: &FieldMap) -> Result<(), BoxError> {
        let request_id = fields.get(context::REQUEST_ID);
        let http_method = fields.get(context::HTTP_METHOD);
        let http_path = fields.get(context::HTTP_PATH);
        let http_status = fields.get(context::HTTP_STATUS);
        let duration_ms = fields.get(context::DURATION_MS);
        let error = fields.get(context::ERROR);

        let extra = render_extra(fields);
        let extra = extra.as_deref();

        if level == Level::ERROR {
            tracing::error!(
                request_id,
                http_method,
                http_path,
                http_status,
                duration_ms,
                error,
                extra,
                "{event}"
            );
        } else if level == Level::WARN {
            tracing::warn!(
                request_id,
                http_method,
                http_path,
                http_status,
                duration_ms,
                error,
                extra,
                "{event}"
            );
        } else {
            tracing::info!(
                request_id,
                http_method,
                http_path,
                http_status,
                duration_ms,
                error,
                extra,
                "{event}"
            );
        }
        Ok(())
    }
}

const RECOGNIZED: [&str; 6] = [
    context::REQUEST_ID,
    context::HTTP_METHOD,
    context::HTTP_PATH,
    context::HTTP_STATUS,
    context::DURATION_MS,
    context::ERROR,
];

fn render_extra(fields: &FieldMap) -> Option<String> {
    let mut rendered = String::new();
    for (key, value) in fields.iter() {
        if RECOGNIZED.contains(&key) {
            continue;
        }
        if !rendered.is_empty() {
            rendered.push(' ');
        }
        rendered.push_str(key);
        rendered.push('=');
        rendered.push_str(value);
    }
    if rendered.is_empty() {
        None
    } else {
        Some(rendered)
    }
}

/// Merge the ambient context under `explicit` (explicit wins ties) and emit
/// through `sink`, discarding sink failures.
pub fn emit(sink: &dyn LogSink, level: Level, event: &str, explicit: &FieldMap) {
    let mut merged = context::current();
    merged.merge(explicit);
    if let Err(err) = sink.emit(level, event, &merged) {
        tracing::debug!(error = %err, event, "log sink failed, event dropped");
    }
}
