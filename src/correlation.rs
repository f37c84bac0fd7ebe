//! The correlation identifier contract.
//!
//! Every request that passes through the middleware carries an opaque token
//! under the `x-request-id` header. An inbound value is adopted verbatim when
//! it is non-blank; otherwise a fresh UUID v4 is generated and written back
//! into the request headers so downstream stages and the route handler all
//! observe the value the response will carry.

use std::fmt;

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::error::WiretapError;

/// Canonical correlation header name. Reads are case-insensitive (a property
/// of [`HeaderMap`]); writes use this exact name.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Opaque token uniquely identifying one request across logs and headers.
///
/// Never mutated after assignment. Handlers running behind the middleware can
/// extract it from request extensions via `axum::Extension<CorrelationId>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Adopt an externally supplied token. Blank (empty or whitespace-only)
    /// values are rejected; no other format validation is applied.
    pub fn new(value: impl Into<String>) -> Result<Self, WiretapError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(WiretapError::EmptyCorrelationId);
        }
        Ok(Self(value))
    }

    /// Generate a fresh identifier: a 128-bit random UUID in textual form.
    /// Infallible.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CorrelationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Read a usable correlation id from `headers`, treating blank values the
/// same as absent ones. Adopted values are returned unchanged (untrimmed).
#[must_use]
pub fn read_request_id(headers: &HeaderMap, header: &HeaderName) -> Option<CorrelationId> {
    headers
        .get(header)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
        .map(|value| CorrelationId(value.to_owned()))
}

/// Ensure `headers` carries a correlation id, generating and inserting one if
/// necessary. Idempotent: a present non-blank value is reused verbatim and
/// the map is left untouched.
pub fn ensure_request_id(headers: &mut HeaderMap, header: &HeaderName) -> CorrelationId {
    if let Some(id) = read_request_id(headers, header) {
        return id;
    }
    let id = CorrelationId::generate();
    // A UUID in textual form is always a valid header value.
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        headers.insert(header.clone(), value);
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> HeaderName {
        HeaderName::from_static(REQUEST_ID_HEADER)
    }

    #[test]
    fn reuses_existing_value_verbatim() {
        let mut headers = HeaderMap::new();
        headers.insert(header(), HeaderValue::from_static("abc-123"));

        let id = ensure_request_id(&mut headers, &header());
        assert_eq!(id.as_str(), "abc-123");
        assert_eq!(headers.get(header()).unwrap(), "abc-123");
    }

    #[test]
    fn header_read_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_bytes(b"X-Request-Id").unwrap(),
            HeaderValue::from_static("abc-123"),
        );

        let id = ensure_request_id(&mut headers, &header());
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn generates_when_absent_and_writes_back() {
        let mut headers = HeaderMap::new();

        let id = ensure_request_id(&mut headers, &header());
        assert!(!id.as_str().trim().is_empty());
        assert_eq!(headers.get(header()).unwrap(), id.as_str());
    }

    #[test]
    fn blank_value_counts_as_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(header(), HeaderValue::from_static("   "));

        let id = ensure_request_id(&mut headers, &header());
        assert!(!id.as_str().trim().is_empty());
        assert_ne!(id.as_str(), "   ");
    }

    #[test]
    fn generated_ids_are_distinct() {
        let a = CorrelationId::generate();
        let b = CorrelationId::generate();
        assert_ne!(a, b);
    }

    #[test]
    fn new_rejects_blank_tokens() {
        assert!(CorrelationId::new("").is_err());
        assert!(CorrelationId::new("  \t ").is_err());
        assert_eq!(CorrelationId::new("abc").unwrap().as_str(), "abc");
    }
}
