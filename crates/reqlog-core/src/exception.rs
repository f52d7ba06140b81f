//! Exception summaries attached to records.
//!
//! An [`ExceptionSummary`] is a serializable snapshot of an error chain. Which
//! fields end up in a record is decided by [`ExceptionCapture`]: the record
//! builder projects the full summary, dropping disabled fields before the
//! record is built.
//!
//! Summaries built from Rust errors carry the type name, message and, on the
//! outermost level, the module path of the error type as `source`. Stack
//! traces and data entries are only present when attached explicitly.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Maximum number of nested levels kept in an exception chain.
///
/// Deeper levels are dropped and the last kept level has
/// [`ExceptionSummary::chain_truncated`] set.
pub const MAX_EXCEPTION_DEPTH: usize = 10;

/// Stable classification of an error, independent of its concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Input failed validation
    Validation,
    /// Requested resource does not exist
    NotFound,
    /// Caller is not authenticated or not allowed
    Unauthorized,
    /// An operation exceeded its deadline
    Timeout,
    /// IO failure
    Io,
    /// Unexpected internal failure
    Internal,
    /// Anything else
    #[default]
    Other,
}

/// Snapshot of an error and its causes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionSummary {
    /// Type name of the error (e.g. `std::io::Error`)
    pub type_name: String,

    /// Stable error kind used for classification
    #[serde(default)]
    pub kind: ErrorKind,

    /// Error message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Stack trace / backtrace text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,

    /// Component that raised the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Free-form context attached to the error
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub data: HashMap<String, String>,

    /// The error that caused this one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<ExceptionSummary>>,

    /// Set when deeper causes were dropped at [`MAX_EXCEPTION_DEPTH`]
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub chain_truncated: bool,
}

impl ExceptionSummary {
    /// Create a summary with a type name and message.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            kind: ErrorKind::Other,
            message: Some(message.into()),
            stack_trace: None,
            source: None,
            data: HashMap::new(),
            inner: None,
            chain_truncated: false,
        }
    }

    /// Build a summary from a Rust error, walking its `source()` chain.
    ///
    /// The outermost level carries the concrete type name of `E` and its
    /// module path as `source`; causes are only known as trait objects and
    /// are named `dyn std::error::Error`.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: std::error::Error + 'static,
    {
        let type_name = std::any::type_name::<E>();
        let mut summary = Self::new(type_name, error.to_string());
        summary.source = module_of(type_name);
        summary.inner = error
            .source()
            .map(|cause| Box::new(Self::from_dyn_error(cause, 1)));
        summary
    }

    /// Build a summary from a type-erased error such as a `Box<dyn Error>`.
    pub fn from_dyn(error: &(dyn std::error::Error + 'static)) -> Self {
        Self::from_dyn_error(error, 0)
    }

    fn from_dyn_error(error: &(dyn std::error::Error + 'static), depth: usize) -> Self {
        let mut summary = Self::new("dyn std::error::Error", error.to_string());
        if let Some(cause) = error.source() {
            if depth + 1 < MAX_EXCEPTION_DEPTH {
                summary.inner = Some(Box::new(Self::from_dyn_error(cause, depth + 1)));
            } else {
                summary.chain_truncated = true;
            }
        }
        summary
    }

    /// Set the error kind.
    pub fn with_kind(mut self, kind: ErrorKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the stack trace.
    pub fn with_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.stack_trace = Some(trace.into());
        self
    }

    /// Set the source component.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a context entry.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Set the inner (causing) error.
    pub fn with_inner(mut self, inner: ExceptionSummary) -> Self {
        self.inner = Some(Box::new(inner));
        self
    }

    /// Number of levels in the chain, this one included.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut current = self.inner.as_deref();
        while let Some(next) = current {
            depth += 1;
            current = next.inner.as_deref();
        }
        depth
    }

    /// Return a copy holding only the fields enabled in `capture`.
    ///
    /// Returns `None` when exception capture is switched off entirely.
    pub fn project(&self, capture: &ExceptionCapture) -> Option<Self> {
        if !capture.enabled {
            return None;
        }
        Some(self.project_level(capture, 0))
    }

    fn project_level(&self, capture: &ExceptionCapture, depth: usize) -> Self {
        let mut chain_truncated = self.chain_truncated;
        let inner = match self.inner.as_deref() {
            Some(inner) if capture.inner => {
                if depth + 1 < MAX_EXCEPTION_DEPTH {
                    Some(Box::new(inner.project_level(capture, depth + 1)))
                } else {
                    chain_truncated = true;
                    None
                }
            }
            _ => None,
        };

        Self {
            type_name: self.type_name.clone(),
            kind: self.kind,
            message: self.message.clone().filter(|_| capture.message),
            stack_trace: self.stack_trace.clone().filter(|_| capture.stack_trace),
            source: self.source.clone().filter(|_| capture.source),
            data: if capture.data {
                self.data.clone()
            } else {
                HashMap::new()
            },
            inner,
            chain_truncated,
        }
    }
}

impl std::fmt::Display for ExceptionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        if let Some(trace) = self.stack_trace.as_deref().filter(|t| !t.trim().is_empty()) {
            write!(f, "\n{}", trace)?;
        }
        if let Some(source) = self.source.as_deref().filter(|s| !s.trim().is_empty()) {
            write!(f, "\nSource: {}", source)?;
        }
        Ok(())
    }
}

/// Module path of a type name, ignoring generic arguments.
fn module_of(type_name: &str) -> Option<String> {
    let base = type_name.split('<').next().unwrap_or(type_name);
    base.rsplit_once("::").map(|(module, _)| module.to_string())
}

/// Which exception fields are collected into records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionCapture {
    /// Master switch. Default: true.
    pub enabled: bool,
    /// Keep the message. Default: true.
    pub message: bool,
    /// Keep the stack trace. Default: true.
    pub stack_trace: bool,
    /// Keep the source component. Default: false.
    pub source: bool,
    /// Keep the data map. Default: false.
    pub data: bool,
    /// Keep the inner chain. Default: true.
    pub inner: bool,
}

impl Default for ExceptionCapture {
    fn default() -> Self {
        Self {
            enabled: true,
            message: true,
            stack_trace: true,
            source: false,
            data: false,
            inner: true,
        }
    }
}

impl ExceptionCapture {
    /// Defaults: everything except source and data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable exception capture.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Toggle message capture.
    pub fn message(mut self, on: bool) -> Self {
        self.message = on;
        self
    }

    /// Toggle stack trace capture.
    pub fn stack_trace(mut self, on: bool) -> Self {
        self.stack_trace = on;
        self
    }

    /// Toggle source capture.
    pub fn source(mut self, on: bool) -> Self {
        self.source = on;
        self
    }

    /// Toggle data capture.
    pub fn data(mut self, on: bool) -> Self {
        self.data = on;
        self
    }

    /// Toggle inner chain capture. When off, only the first level is kept.
    pub fn inner(mut self, on: bool) -> Self {
        self.inner = on;
        self
    }
}
