//! Wiretap is request correlation and structured request-logging middleware
//! for tower/axum gateway pipelines.
//!
//! It guarantees that every inbound request carries a stable correlation
//! identifier (`x-request-id`), propagates that identifier to the client and
//! to every structured log emitted while the request is being handled, and
//! records start/end/error events with timing and status — without leaking
//! per-request context between requests that share pooled workers.
//!
//! # Architecture
//!
//! - [`correlation`] -- The correlation identifier contract: header name,
//!   [`CorrelationId`](correlation::CorrelationId), and the idempotent
//!   ensure-assign operation.
//! - [`context`] -- Ambient logging context: a task-local field map scoped to
//!   one logical request, with merge-on-entry / restore-on-exit semantics.
//! - [`sink`] -- The [`LogSink`](sink::LogSink) seam consumed by the
//!   middleware, with a default `tracing`-backed implementation.
//! - [`middleware`] -- The consolidated request-logging tower layer:
//!   tag-only, inline, or structured-context styles selected by config.
//! - [`stack`] -- Priority-ordered middleware stage registration for axum
//!   routers.
//! - [`error`] -- Crate error types using `thiserror`.
//! - [`logging`] -- Structured tracing-subscriber setup with JSON and
//!   pretty-print output, for host binaries and tests.
//!
//! # Quick start
//!
//! ```no_run
//! use axum::{routing::get, Router};
//! use wiretap::stack::{priority, Pipeline};
//! use wiretap::{RequestLogConfig, RequestLogLayer};
//!
//! let router = Router::new().route("/health", get(|| async { "ok" }));
//! let router = Pipeline::new()
//!     .register(priority::CORRELATION, "correlation", |r| {
//!         r.layer(RequestLogLayer::tagging())
//!     })
//!     .register(priority::REQUEST_LOG, "request-log", |r| {
//!         r.layer(RequestLogLayer::new(RequestLogConfig::logging()))
//!     })
//!     .apply(router);
//! # let _ = router;
//! ```

pub mod context;
pub mod correlation;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod sink;
pub mod stack;

pub use correlation::{CorrelationId, REQUEST_ID_HEADER};
pub use error::WiretapError;
pub use middleware::{LogStyle, PathFilter, RequestLog, RequestLogConfig, RequestLogLayer};
pub use sink::{LogSink, TracingSink};
