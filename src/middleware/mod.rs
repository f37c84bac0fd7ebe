//! The consolidated request-correlation and request-logging tower middleware.
//!
//! One configurable [`RequestLogLayer`] replaces what would otherwise be a
//! family of near-duplicate filters. [`LogStyle`] selects the behavior:
//! `TagOnly` assigns and propagates the correlation id without emitting
//! events (the assigner role, run earliest), `Structured` additionally logs
//! start/terminal events with fields carried through the ambient context, and
//! `Inline` logs the same information interpolated into the event message.
//!
//! Guarantees for selected requests: the correlation id is assigned before
//! the downstream chain runs and is always present on the response; exactly
//! one `request_start` and exactly one terminal event (`request_end`,
//! `request_error`, or `request_cancelled`) are emitted; downstream errors
//! are observed for logging and re-surfaced unchanged; ambient context is
//! restored on every exit path, including cancellation.

pub mod selector;

pub use selector::PathFilter;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use http::header::HeaderName;
use http::{HeaderValue, Request, Response};
use tower::{Layer, Service};
use tracing::Level;

use crate::context::{self, FieldMap};
use crate::correlation::{self, CorrelationId, REQUEST_ID_HEADER};
use crate::error::WiretapError;
use crate::sink::{self, LogSink, TracingSink};

/// How the middleware reports request activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStyle {
    /// Structured events; fields travel through the ambient context so the
    /// sink can attach them to every log line emitted during handling.
    Structured,
    /// Single-line events with fields interpolated into the message.
    Inline,
    /// Assign and propagate the correlation id; emit no events.
    TagOnly,
}

#[derive(Clone)]
pub struct RequestLogConfig {
    style: LogStyle,
    filter: PathFilter,
    header: HeaderName,
    sink: Arc<dyn LogSink>,
}

impl fmt::Debug for RequestLogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestLogConfig")
            .field("style", &self.style)
            .field("filter", &self.filter)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl RequestLogConfig {
    /// Logger role: structured events for the operational namespace.
    #[must_use]
    pub fn logging() -> Self {
        Self {
            style: LogStyle::Structured,
            filter: PathFilter::ops(),
            header: HeaderName::from_static(REQUEST_ID_HEADER),
            sink: Arc::new(TracingSink),
        }
    }

    /// Assigner role: tag every request, log nothing.
    #[must_use]
    pub fn tagging() -> Self {
        Self {
            style: LogStyle::TagOnly,
            filter: PathFilter::all(),
            ..Self::logging()
        }
    }

    #[must_use]
    pub fn with_style(mut self, style: LogStyle) -> Self {
        self.style = style;
        self
    }

    #[must_use]
    pub fn with_filter(mut self, filter: PathFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Override the correlation header name.
    pub fn with_header_name(mut self, name: &str) -> Result<Self, WiretapError> {
        self.header = name
            .parse::<HeaderName>()
            .map_err(|source| WiretapError::InvalidHeaderName {
                name: name.to_owned(),
                source,
            })?;
        Ok(self)
    }

    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self::logging()
    }
}

/// Tower layer wrapping services in [`RequestLog`].
#[derive(Debug, Clone)]
pub struct RequestLogLayer {
    config: Arc<RequestLogConfig>,
}

impl RequestLogLayer {
    #[must_use]
    pub fn new(config: RequestLogConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The assigner preset: tag every request, earliest in the stack.
    #[must_use]
    pub fn tagging() -> Self {
        Self::new(RequestLogConfig::tagging())
    }
}

impl Default for RequestLogLayer {
    fn default() -> Self {
        Self::new(RequestLogConfig::logging())
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLog<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLog {
            inner,
            config: Arc::clone(&self.config),
        }
    }
}

/// The middleware service. See the module docs for semantics.
#[derive(Debug, Clone)]
pub struct RequestLog<S> {
    inner: S,
    config: Arc<RequestLogConfig>,
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestLog<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Error: fmt::Display + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = BoxFuture<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut TaskContext<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<ReqBody>) -> Self::Future {
        // Readiness was established on `self`; hand the ready instance to the
        // future and leave the fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        let config = Arc::clone(&self.config);

        let path = req.uri().path().to_owned();
        if !config.filter.matches(&path) {
            // Bypass: no id work, no events, no scope.
            return Box::pin(async move { inner.call(req).await });
        }

        let method = req.method().as_str().to_owned();
        let header = config.header.clone();
        let id = correlation::ensure_request_id(req.headers_mut(), &header);
        req.extensions_mut().insert(id.clone());

        if config.style == LogStyle::TagOnly {
            return Box::pin(async move {
                let mut response = inner.call(req).await?;
                set_response_id(&mut response, &header, &id);
                Ok(response)
            });
        }

        let ambient = vec![
            (context::REQUEST_ID, Some(id.as_str().to_owned())),
            (context::HTTP_METHOD, Some(method.clone())),
            (context::HTTP_PATH, Some(path.clone())),
        ];
        let structured = config.style == LogStyle::Structured;

        let run = async move {
            let mut guard = TerminalGuard::new(config, id.clone(), method, path);
            guard.start_event();
            match inner.call(req).await {
                Ok(mut response) => {
                    guard.finish_success(response.status().as_u16());
                    set_response_id(&mut response, &header, &id);
                    Ok(response)
                }
                Err(err) => {
                    guard.finish_error(short_type_name::<S::Error>(), &err);
                    Err(err)
                }
            }
        };

        if structured {
            Box::pin(context::scope(ambient, run))
        } else {
            Box::pin(run)
        }
    }
}

fn set_response_id<B>(response: &mut Response<B>, header: &HeaderName, id: &CorrelationId) {
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(header.clone(), value);
    }
}

fn short_type_name<T: ?Sized>() -> &'static str {
    let name = std::any::type_name::<T>();
    // Drop the generic arguments first, or the rightmost `::` lands inside
    // them (e.g. `Box<dyn std::error::Error + Send + Sync>`).
    let base = name.split('<').next().unwrap_or(name);
    base.rsplit("::").next().unwrap_or(base)
}

/// Emits the start event and exactly one terminal event.
///
/// Dropped before `finish_*` means the response future was cancelled; the
/// drop handler then emits the `request_cancelled` terminal event so the
/// start event is never left unpaired.
struct TerminalGuard {
    config: Arc<RequestLogConfig>,
    id: CorrelationId,
    method: String,
    path: String,
    start: Instant,
    finished: bool,
}

impl TerminalGuard {
    fn new(config: Arc<RequestLogConfig>, id: CorrelationId, method: String, path: String) -> Self {
        Self {
            config,
            id,
            method,
            path,
            start: Instant::now(),
            finished: false,
        }
    }

    fn base_fields(&self) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert(context::REQUEST_ID, self.id.as_str());
        fields.insert(context::HTTP_METHOD, self.method.as_str());
        fields.insert(context::HTTP_PATH, self.path.as_str());
        fields
    }

    fn elapsed_ms(&self) -> String {
        u64::try_from(self.start.elapsed().as_millis())
            .unwrap_or(u64::MAX)
            .to_string()
    }

    fn start_event(&self) {
        self.emit(Level::INFO, "request_start", &self.base_fields());
    }

    fn finish_success(&mut self, status: u16) {
        self.finished = true;
        let mut fields = self.base_fields();
        fields.insert(context::HTTP_STATUS, status.to_string());
        fields.insert(context::DURATION_MS, self.elapsed_ms());
        self.emit(Level::INFO, "request_end", &fields);
    }

    fn finish_error(&mut self, kind: &str, err: &dyn fmt::Display) {
        self.finished = true;
        let mut fields = self.base_fields();
        fields.insert(context::DURATION_MS, self.elapsed_ms());
        fields.insert(context::ERROR, format!("{kind}: {err}"));
        self.emit(Level::ERROR, "request_error", &fields);
    }

    fn emit(&self, level: Level, event: &str, fields: &FieldMap) {
        match self.config.style {
            LogStyle::Inline => {
                let message = inline_message(event, fields);
                sink::emit(&*self.config.sink, level, &message, &FieldMap::new());
            }
            _ => sink::emit(&*self.config.sink, level, event, fields),
        }
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut fields = self.base_fields();
        fields.insert(context::DURATION_MS, self.elapsed_ms());
        self.emit(Level::INFO, "request_cancelled", &fields);
    }
}

fn inline_message(event: &str, fields: &FieldMap) -> String {
    let mut message = String::from(event);
    for key in [
        context::REQUEST_ID,
        context::HTTP_METHOD,
        context::HTTP_PATH,
        context::HTTP_STATUS,
        context::DURATION_MS,
        context::ERROR,
    ] {
        if let Some(value) = fields.get(key) {
            message.push(' ');
            message.push_str(key);
            message.push('=');
            message.push_str(value);
        }
    }
    message
}
