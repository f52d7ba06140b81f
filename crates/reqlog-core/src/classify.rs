//! Severity classification.
//!
//! Resolution order:
//!
//! 1. Path overrides, matched by prefix. When several prefixes match, the
//!    longest one wins.
//! 2. Exception rules, evaluated in registration order; the first matching
//!    rule wins. A broad rule registered before a narrow one shadows it.
//! 3. The status ladder: `>= 500` Critical, `>= 400` Error, `>= 300`
//!    Warning, otherwise Info.

use crate::exception::{ErrorKind, ExceptionSummary};
use crate::record::Severity;
use std::fmt;
use std::sync::Arc;

/// Predicate used by [`ExceptionMatcher::Predicate`].
pub type ExceptionPredicate = Arc<dyn Fn(&ExceptionSummary) -> bool + Send + Sync>;

/// Selects the exceptions an override applies to.
#[derive(Clone)]
pub enum ExceptionMatcher {
    /// Exact type name.
    Type(String),
    /// Type names starting with a prefix, e.g. a module path such as
    /// `sqlx::`. Acts as a "family of types" match.
    TypePrefix(String),
    /// Stable error kind.
    Kind(ErrorKind),
    /// Arbitrary predicate.
    Predicate(ExceptionPredicate),
}

impl ExceptionMatcher {
    /// Check whether `exception` is selected.
    pub fn matches(&self, exception: &ExceptionSummary) -> bool {
        match self {
            ExceptionMatcher::Type(name) => exception.type_name == *name,
            ExceptionMatcher::TypePrefix(prefix) => exception.type_name.starts_with(prefix.as_str()),
            ExceptionMatcher::Kind(kind) => exception.kind == *kind,
            ExceptionMatcher::Predicate(predicate) => predicate(exception),
        }
    }
}

impl fmt::Debug for ExceptionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExceptionMatcher::Type(name) => f.debug_tuple("Type").field(name).finish(),
            ExceptionMatcher::TypePrefix(prefix) => {
                f.debug_tuple("TypePrefix").field(prefix).finish()
            }
            ExceptionMatcher::Kind(kind) => f.debug_tuple("Kind").field(kind).finish(),
            ExceptionMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Per-path and per-exception severity overrides.
#[derive(Debug, Clone, Default)]
pub struct SeverityOverrides {
    paths: Vec<(String, Severity)>,
    exceptions: Vec<(ExceptionMatcher, Severity)>,
}

impl SeverityOverrides {
    /// Empty override table: only the status ladder applies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a level to every path starting with `prefix`.
    ///
    /// Registering the same prefix again replaces its level.
    pub fn path(mut self, prefix: impl Into<String>, level: Severity) -> Self {
        let prefix = prefix.into();
        match self.paths.iter_mut().find(|(p, _)| *p == prefix) {
            Some(entry) => entry.1 = level,
            None => self.paths.push((prefix, level)),
        }
        self
    }

    /// Append an exception rule. Rules are evaluated in registration order.
    pub fn exception(mut self, matcher: ExceptionMatcher, level: Severity) -> Self {
        self.exceptions.push((matcher, level));
        self
    }

    /// Shorthand for an exact type-name rule.
    pub fn exception_type(self, type_name: impl Into<String>, level: Severity) -> Self {
        self.exception(ExceptionMatcher::Type(type_name.into()), level)
    }

    /// Shorthand for an error-kind rule.
    pub fn exception_kind(self, kind: ErrorKind, level: Severity) -> Self {
        self.exception(ExceptionMatcher::Kind(kind), level)
    }

    /// Check if no overrides are configured.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty() && self.exceptions.is_empty()
    }

    /// Level for `path`, if a prefix matches. Longest prefix wins.
    pub fn path_level(&self, path: &str) -> Option<Severity> {
        self.paths
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix.as_str()))
            .max_by_key(|(prefix, _)| prefix.len())
            .map(|(_, level)| *level)
    }

    /// Level for `exception` from the first matching rule.
    pub fn exception_level(&self, exception: &ExceptionSummary) -> Option<Severity> {
        self.exceptions
            .iter()
            .find(|(matcher, _)| matcher.matches(exception))
            .map(|(_, level)| *level)
    }

    /// Classify an activity.
    pub fn classify(
        &self,
        status: u16,
        exception: Option<&ExceptionSummary>,
        path: &str,
    ) -> Severity {
        if let Some(level) = self.path_level(path) {
            return level;
        }
        if let Some(level) = exception.and_then(|e| self.exception_level(e)) {
            return level;
        }
        status_ladder(status)
    }
}

/// Default status-code classification.
pub fn status_ladder(status: u16) -> Severity {
    match status {
        500.. => Severity::Critical,
        400..=499 => Severity::Error,
        300..=399 => Severity::Warning,
        _ => Severity::Info,
    }
}
