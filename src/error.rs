//! Unified error types for Wiretap.
//!
//! Errors arise only at configuration time; runtime tagging and logging are
//! infallible by design (log-sink failures are contained by [`crate::sink`]
//! and never surface here).

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum WiretapError {
    #[error("Correlation id must not be empty or whitespace-only")]
    EmptyCorrelationId,

    #[error("Invalid correlation header name '{name}': {source}")]
    InvalidHeaderName {
        name: String,
        #[source]
        source: http::header::InvalidHeaderName,
    },
}
