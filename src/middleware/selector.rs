//! Path selection predicate for the request logger.
//!
//! Requests whose path does not match are invoked directly with zero logging
//! overhead. The default selection covers the operational/health namespace
//! plus the test namespace.

/// Decides which request paths the logger applies to.
#[derive(Debug, Clone)]
pub struct PathFilter {
    match_all: bool,
    prefixes: Vec<String>,
    exact: Vec<String>,
}

impl PathFilter {
    /// Operational/health namespace: `/actuator/*`, `/health`, `/prometheus`,
    /// and the `/test*` namespace.
    #[must_use]
    pub fn ops() -> Self {
        Self {
            match_all: false,
            prefixes: vec!["/actuator/".to_owned(), "/test".to_owned()],
            exact: vec!["/health".to_owned(), "/prometheus".to_owned()],
        }
    }

    /// Match every path.
    #[must_use]
    pub fn all() -> Self {
        Self {
            match_all: true,
            prefixes: Vec::new(),
            exact: Vec::new(),
        }
    }

    /// Match nothing; add paths with [`with_prefix`](Self::with_prefix) and
    /// [`with_exact`](Self::with_exact).
    #[must_use]
    pub fn none() -> Self {
        Self {
            match_all: false,
            prefixes: Vec::new(),
            exact: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    #[must_use]
    pub fn with_exact(mut self, path: impl Into<String>) -> Self {
        self.exact.push(path.into());
        self
    }

    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        self.match_all
            || self.exact.iter().any(|p| p == path)
            || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

impl Default for PathFilter {
    fn default() -> Self {
        Self::ops()
    }
}
