//! Turning an observed activity into a [`Record`].
//!
//! An [`ActivityTimer`] is started when the request arrives and handed to a
//! [`RecordBuilder`] once the response (or error) is known. The builder
//! applies the [`CaptureConfig`]: header and body toggles, the content-type
//! allow-list, redaction, exception projection and severity classification.
//!
//! ```
//! use reqlog_core::{ActivityTimer, CaptureConfig, RecordBuilder, Severity};
//!
//! let config = CaptureConfig::new().capture_request_body(true);
//! let timer = ActivityTimer::start();
//!
//! let record = RecordBuilder::with_config(&config, "POST", "/login")
//!     .timer(timer)
//!     .status(401)
//!     .request_body(Some("application/json"), r#"{"user":"ana","password":"hunter2"}"#)
//!     .build();
//!
//! assert_eq!(record.severity, Severity::Error);
//! let body = record.request_body.unwrap().raw.unwrap();
//! assert_eq!(body, r#"{"user":"ana","password":"***"}"#);
//! ```

use crate::config::CaptureConfig;
use crate::exception::ExceptionSummary;
use crate::record::{BodySummary, Record};
use chrono::{DateTime, Utc};
use http::HeaderMap;
use std::sync::OnceLock;
use std::time::Instant;

/// Monotonic timing token for one activity.
#[derive(Debug, Clone, Copy)]
pub struct ActivityTimer {
    started: Instant,
    started_at: DateTime<Utc>,
}

impl ActivityTimer {
    /// Start timing now.
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
        }
    }

    /// Wall-clock time the activity started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Milliseconds elapsed since [`start`](Self::start), with sub-millisecond precision.
    pub fn elapsed_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }
}

fn default_capture() -> &'static CaptureConfig {
    static DEFAULT: OnceLock<CaptureConfig> = OnceLock::new();
    DEFAULT.get_or_init(CaptureConfig::new)
}

struct PendingBody {
    content_type: Option<String>,
    raw: String,
}

/// Builder for [`Record`].
pub struct RecordBuilder<'a> {
    config: &'a CaptureConfig,
    method: String,
    path: String,
    status: u16,
    timer: Option<ActivityTimer>,
    duration_ms: Option<f64>,
    client_addr: Option<String>,
    correlation_id: Option<String>,
    content_type: Option<String>,
    request_headers: Option<HeaderMap>,
    response_headers: Option<HeaderMap>,
    request_body: Option<PendingBody>,
    response_body: Option<PendingBody>,
    exception: Option<ExceptionSummary>,
}

impl RecordBuilder<'static> {
    /// Start a record using the default [`CaptureConfig`].
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RecordBuilder::with_config(default_capture(), method, path)
    }
}

impl<'a> RecordBuilder<'a> {
    /// Start a record governed by `config`.
    pub fn with_config(
        config: &'a CaptureConfig,
        method: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            config,
            method: method.into(),
            path: path.into(),
            status: 200,
            timer: None,
            duration_ms: None,
            client_addr: None,
            correlation_id: None,
            content_type: None,
            request_headers: None,
            response_headers: None,
            request_body: None,
            response_body: None,
            exception: None,
        }
    }

    /// Response status code. Defaults to 200.
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// Take the duration from a timer.
    pub fn timer(mut self, timer: ActivityTimer) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Set the duration explicitly, overriding any timer.
    pub fn duration_ms(mut self, duration_ms: f64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Remote client address.
    pub fn client_addr(mut self, addr: impl Into<String>) -> Self {
        self.client_addr = Some(addr.into());
        self
    }

    /// Correlation id. A UUID v4 is generated when absent.
    pub fn correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Request content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Request headers, sanitized at build time.
    pub fn request_headers(mut self, headers: &HeaderMap) -> Self {
        self.request_headers = Some(headers.clone());
        self
    }

    /// Response headers, sanitized at build time.
    pub fn response_headers(mut self, headers: &HeaderMap) -> Self {
        self.response_headers = Some(headers.clone());
        self
    }

    /// Request body text and its content type.
    pub fn request_body(mut self, content_type: Option<&str>, raw: impl Into<String>) -> Self {
        self.request_body = Some(PendingBody {
            content_type: content_type.map(str::to_string),
            raw: raw.into(),
        });
        self
    }

    /// Response body text and its content type.
    pub fn response_body(mut self, content_type: Option<&str>, raw: impl Into<String>) -> Self {
        self.response_body = Some(PendingBody {
            content_type: content_type.map(str::to_string),
            raw: raw.into(),
        });
        self
    }

    /// Attach an exception summary.
    pub fn exception(mut self, exception: ExceptionSummary) -> Self {
        self.exception = Some(exception);
        self
    }

    /// Attach a Rust error, walking its source chain.
    pub fn error<E: std::error::Error + 'static>(self, error: &E) -> Self {
        self.exception(ExceptionSummary::from_error(error))
    }

    /// Apply the capture configuration and produce the record.
    pub fn build(self) -> Record {
        let config = self.config;
        let redaction = &config.redaction;

        let severity = config
            .severity
            .classify(self.status, self.exception.as_ref(), &self.path);
        let exception = self
            .exception
            .as_ref()
            .and_then(|e| e.project(&config.exceptions));

        let request_headers = self
            .request_headers
            .filter(|_| config.capture_request_headers)
            .map(|h| redaction.sanitize_header_map(&h));
        let response_headers = self
            .response_headers
            .filter(|_| config.capture_response_headers)
            .map(|h| redaction.sanitize_header_map(&h));

        let content_type = self.content_type.or_else(|| {
            self.request_body
                .as_ref()
                .and_then(|b| b.content_type.clone())
        });
        let request_body = self
            .request_body
            .filter(|_| config.capture_request_body)
            .and_then(|b| summarize_body(config, b));
        let response_body = self
            .response_body
            .filter(|_| config.capture_response_body)
            .and_then(|b| summarize_body(config, b));

        let duration_ms = self
            .duration_ms
            .or_else(|| self.timer.map(|t| t.elapsed_ms()))
            .unwrap_or(0.0);
        let timestamp = Utc::now();

        Record {
            method: self.method,
            path: self.path,
            status: self.status,
            duration_ms,
            timestamp,
            content_type,
            client_addr: self.client_addr,
            correlation_id: self
                .correlation_id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            request_headers,
            response_headers,
            request_body,
            response_body,
            severity,
            exception,
        }
    }
}

fn summarize_body(config: &CaptureConfig, body: PendingBody) -> Option<BodySummary> {
    if !config.is_capturable_content_type(body.content_type.as_deref()) {
        return None;
    }
    Some(
        config
            .redaction
            .sanitize_body(&body.raw, config.max_body_size),
    )
}
