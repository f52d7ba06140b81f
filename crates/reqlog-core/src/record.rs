//! The record data model.
//!
//! A [`Record`] describes one observed request/response cycle. It is built
//! once (usually through [`RecordBuilder`](crate::capture::RecordBuilder)),
//! handed to the pipeline, and only ever read afterwards.

use crate::exception::ExceptionSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Severity assigned to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Successful or informational activity
    Info,
    /// Redirects and other noteworthy outcomes
    Warning,
    /// Client errors
    Error,
    /// Server errors
    Critical,
}

impl Severity {
    /// Lowercase name, as serialized.
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A captured, sanitized request or response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodySummary {
    /// Sanitized body text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,

    /// Length in characters after truncation
    pub size: usize,

    /// Whether the original body exceeded the size ceiling
    pub truncated: bool,
}

/// One observed request/response activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// HTTP method (GET, POST, ...)
    pub method: String,

    /// Request path (without query string)
    pub path: String,

    /// Response status code
    pub status: u16,

    /// Processing time in milliseconds
    pub duration_ms: f64,

    /// When the activity completed
    pub timestamp: DateTime<Utc>,

    /// Request content type
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,

    /// Client address
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,

    /// Correlation identifier shared with other logs of the same activity
    pub correlation_id: String,

    /// Sanitized request headers (absent when header capture is off)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_headers: Option<HashMap<String, String>>,

    /// Sanitized response headers (absent when header capture is off)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_headers: Option<HashMap<String, String>>,

    /// Captured request body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<BodySummary>,

    /// Captured response body
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_body: Option<BodySummary>,

    /// Assigned severity
    pub severity: Severity,

    /// Error raised while handling the activity
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<ExceptionSummary>,
}

impl Record {
    /// Check if this is a successful request (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if this is a client error (4xx status).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if this is a server error (5xx status).
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    /// Serialize as a single JSON line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
pub(crate) fn sample(path: &str, status: u16) -> Record {
    Record {
        method: "GET".to_string(),
        path: path.to_string(),
        status,
        duration_ms: 1.25,
        timestamp: Utc::now(),
        content_type: None,
        client_addr: None,
        correlation_id: format!("corr-{}", path),
        request_headers: None,
        response_headers: None,
        request_body: None,
        response_body: None,
        severity: crate::classify::status_ladder(status),
        exception: None,
    }
}
