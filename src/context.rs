//! Ambient logging context: a per-request key/value store for log fields.
//!
//! The store is carried in a `tokio::task_local!`, so it travels with the
//! logical request (the future), not with whichever worker thread happens to
//! poll it. Scopes use merge-on-entry semantics: entering a scope clones the
//! current map and applies a delta, leaving the outer map untouched. Exit —
//! normal, error, panic, or cancellation — therefore restores exactly the
//! state observed on entry, and sibling requests multiplexed onto the same
//! worker can never observe each other's fields.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::future::Future;

use serde::Serialize;

/// Correlation identifier of the request being handled.
pub const REQUEST_ID: &str = "request_id";
/// HTTP method of the request.
pub const HTTP_METHOD: &str = "http_method";
/// Request path.
pub const HTTP_PATH: &str = "http_path";
/// Terminal HTTP status code.
pub const HTTP_STATUS: &str = "http_status";
/// Elapsed handling time in milliseconds.
pub const DURATION_MS: &str = "duration_ms";
/// Error kind and message for failed requests.
pub const ERROR: &str = "error";

/// An ordered map of log fields.
///
/// Keys are typically the `&'static str` constants above, but arbitrary keys
/// are accepted; sinks that ship JSON can serialize the map directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldMap(BTreeMap<Cow<'static, str>, String>);

impl FieldMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<Cow<'static, str>>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    /// Overlay `other` on top of this map. `other` wins ties.
    pub fn merge(&mut self, other: &Self) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Apply a delta: `Some(value)` sets a key, `None` removes it entirely.
    ///
    /// Removal matters for scoping — a key cleared by an inner scope must not
    /// read as present just because an outer scope set it.
    pub fn apply<K, V, I>(&mut self, delta: I)
    where
        K: Into<Cow<'static, str>>,
        V: Into<String>,
        I: IntoIterator<Item = (K, Option<V>)>,
    {
        for (key, value) in delta {
            let key = key.into();
            match value {
                Some(value) => {
                    self.0.insert(key, value.into());
                }
                None => {
                    self.0.remove(key.as_ref());
                }
            }
        }
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<Cow<'static, str>>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

tokio::task_local! {
    static AMBIENT: FieldMap;
}

/// Snapshot of the active scope's fields. Empty outside any scope.
#[must_use]
pub fn current() -> FieldMap {
    AMBIENT.try_with(Clone::clone).unwrap_or_default()
}

/// Run `future` with the current fields overlaid by `delta`.
///
/// The prior map is restored when the returned future completes or is
/// dropped, and concurrent scopes on other tasks are unaffected.
pub async fn scope<K, V, I, F>(delta: I, future: F) -> F::Output
where
    K: Into<Cow<'static, str>>,
    V: Into<String>,
    I: IntoIterator<Item = (K, Option<V>)>,
    F: Future,
{
    let mut fields = current();
    fields.apply(delta);
    AMBIENT.scope(fields, future).await
}

/// Synchronous variant of [`scope`] for non-async actions (e.g. a single
/// log emission). Restores the prior state even if `f` panics.
pub fn sync_scope<K, V, I, T>(delta: I, f: impl FnOnce() -> T) -> T
where
    K: Into<Cow<'static, str>>,
    V: Into<String>,
    I: IntoIterator<Item = (K, Option<V>)>,
{
    let mut fields = current();
    fields.apply(delta);
    AMBIENT.sync_scope(fields, f)
}
