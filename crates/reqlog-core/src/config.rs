//! Pipeline and capture configuration.
//!
//! [`RuntimeConfig`] controls the buffer and the dispatch worker;
//! [`CaptureConfig`] controls what goes into each record. Both use the
//! builder pattern:
//!
//! ```
//! use reqlog_core::{CaptureConfig, RuntimeConfig, Severity};
//! use std::time::Duration;
//!
//! let runtime = RuntimeConfig::new()
//!     .buffer_capacity(5_000)
//!     .batch_size(200)
//!     .flush_interval(Duration::from_millis(500));
//! assert!(runtime.validate().is_ok());
//!
//! let capture = CaptureConfig::new()
//!     .capture_request_body(true)
//!     .max_body_size(8_192)
//!     .deny_path("/metrics");
//! assert!(!capture.should_capture("/metrics"));
//! ```
//!
//! With the `config` feature both can be loaded from `REQLOG_*` environment
//! variables (a `.env` file is honoured).

use crate::classify::SeverityOverrides;
use crate::error::ConfigError;
use crate::exception::ExceptionCapture;
use crate::redact::RedactionPolicy;
use std::collections::HashSet;
use std::time::Duration;

/// Buffer and dispatch worker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Administrative switch. Default: true.
    pub(crate) enabled: bool,
    /// Maximum buffered records. Default: 10 000.
    pub(crate) buffer_capacity: usize,
    /// Maximum records per drain. Default: 100.
    pub(crate) batch_size: usize,
    /// Sleep between drains. Default: 1 second.
    pub(crate) flush_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RuntimeConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self {
            enabled: true,
            buffer_capacity: 10_000,
            batch_size: 100,
            flush_interval: Duration::from_secs(1),
        }
    }

    /// Enable or disable the pipeline.
    ///
    /// A disabled pipeline accepts submissions and silently discards them.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the buffer capacity.
    pub fn buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Set the maximum number of records drained per cycle.
    pub fn batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the sleep between drain cycles.
    pub fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Whether the pipeline is enabled.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Configured buffer capacity.
    pub fn get_buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Configured batch size.
    pub fn get_batch_size(&self) -> usize {
        self.batch_size
    }

    /// Configured flush interval.
    pub fn get_flush_interval(&self) -> Duration {
        self.flush_interval
    }

    /// Reject non-positive settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_capacity == 0 {
            return Err(ConfigError::NotPositive("buffer_capacity"));
        }
        if self.batch_size == 0 {
            return Err(ConfigError::NotPositive("batch_size"));
        }
        if self.flush_interval.is_zero() {
            return Err(ConfigError::NotPositive("flush_interval"));
        }
        Ok(())
    }
}

/// Path allow/deny rules deciding which activities are captured.
///
/// Rules match whole path segments: `/api` matches `/api` and `/api/users`
/// but not `/apiary`. Deny rules win over allow rules. With no allow rules,
/// every path not denied is captured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointFilter {
    allow: Vec<String>,
    deny: Vec<String>,
}

impl EndpointFilter {
    /// Empty filter: capture everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture paths under `prefix` (and, once any allow rule exists, only those).
    pub fn allow(mut self, prefix: impl Into<String>) -> Self {
        self.allow.push(normalize_prefix(prefix.into()));
        self
    }

    /// Never capture paths under `prefix`.
    pub fn deny(mut self, prefix: impl Into<String>) -> Self {
        self.deny.push(normalize_prefix(prefix.into()));
        self
    }

    /// Check if any rule is configured.
    pub fn has_rules(&self) -> bool {
        !self.allow.is_empty() || !self.deny.is_empty()
    }

    /// Decide whether `path` is captured.
    pub fn should_capture(&self, path: &str) -> bool {
        if self.deny.iter().any(|d| starts_with_segments(path, d)) {
            return false;
        }
        self.allow.is_empty() || self.allow.iter().any(|a| starts_with_segments(path, a))
    }
}

fn normalize_prefix(prefix: String) -> String {
    let trimmed = prefix.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Segment-aware, case-insensitive prefix match.
fn starts_with_segments(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    if path.len() < prefix.len() || !path.is_char_boundary(prefix.len()) {
        return false;
    }
    let (head, rest) = path.split_at(prefix.len());
    head.eq_ignore_ascii_case(prefix) && (rest.is_empty() || rest.starts_with('/'))
}

/// What goes into each record.
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Capture request bodies. Default: false.
    pub(crate) capture_request_body: bool,
    /// Capture response bodies. Default: false.
    pub(crate) capture_response_body: bool,
    /// Capture request headers. Default: true.
    pub(crate) capture_request_headers: bool,
    /// Capture response headers. Default: true.
    pub(crate) capture_response_headers: bool,
    /// Content types whose bodies may be read. Default: `application/json`.
    pub(crate) allowed_content_types: HashSet<String>,
    /// Body ceiling in characters. Default: 32 000.
    pub(crate) max_body_size: usize,
    pub(crate) redaction: RedactionPolicy,
    pub(crate) severity: SeverityOverrides,
    pub(crate) exceptions: ExceptionCapture,
    pub(crate) endpoints: EndpointFilter,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        let mut allowed = HashSet::new();
        allowed.insert("application/json".to_string());

        Self {
            capture_request_body: false,
            capture_response_body: false,
            capture_request_headers: true,
            capture_response_headers: true,
            allowed_content_types: allowed,
            max_body_size: 32_000,
            redaction: RedactionPolicy::new(),
            severity: SeverityOverrides::new(),
            exceptions: ExceptionCapture::new(),
            endpoints: EndpointFilter::new(),
        }
    }

    /// Enable or disable request body capture.
    pub fn capture_request_body(mut self, capture: bool) -> Self {
        self.capture_request_body = capture;
        self
    }

    /// Enable or disable response body capture.
    pub fn capture_response_body(mut self, capture: bool) -> Self {
        self.capture_response_body = capture;
        self
    }

    /// Enable or disable request header capture.
    pub fn capture_request_headers(mut self, capture: bool) -> Self {
        self.capture_request_headers = capture;
        self
    }

    /// Enable or disable response header capture.
    pub fn capture_response_headers(mut self, capture: bool) -> Self {
        self.capture_response_headers = capture;
        self
    }

    /// Replace the allowed content types. `type/*` wildcards are accepted.
    pub fn allowed_content_types(
        mut self,
        types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_content_types = types.into_iter().map(|t| t.into().to_lowercase()).collect();
        self
    }

    /// Add an allowed content type.
    pub fn allow_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.allowed_content_types
            .insert(content_type.into().to_lowercase());
        self
    }

    /// Set the body ceiling in characters.
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.max_body_size = size;
        self
    }

    /// Set the redaction policy.
    pub fn redaction(mut self, policy: RedactionPolicy) -> Self {
        self.redaction = policy;
        self
    }

    /// Set the severity overrides.
    pub fn severity(mut self, overrides: SeverityOverrides) -> Self {
        self.severity = overrides;
        self
    }

    /// Set which exception fields are captured.
    pub fn exceptions(mut self, capture: ExceptionCapture) -> Self {
        self.exceptions = capture;
        self
    }

    /// Set the endpoint filter.
    pub fn endpoints(mut self, filter: EndpointFilter) -> Self {
        self.endpoints = filter;
        self
    }

    /// Shorthand for adding an allow rule to the endpoint filter.
    pub fn allow_path(mut self, prefix: impl Into<String>) -> Self {
        self.endpoints = self.endpoints.allow(prefix);
        self
    }

    /// Shorthand for adding a deny rule to the endpoint filter.
    pub fn deny_path(mut self, prefix: impl Into<String>) -> Self {
        self.endpoints = self.endpoints.deny(prefix);
        self
    }

    /// The redaction policy in use.
    pub fn redaction_policy(&self) -> &RedactionPolicy {
        &self.redaction
    }

    /// The severity overrides in use.
    pub fn severity_overrides(&self) -> &SeverityOverrides {
        &self.severity
    }

    /// Whether request bodies are captured.
    pub fn captures_request_body(&self) -> bool {
        self.capture_request_body
    }

    /// Whether response bodies are captured.
    pub fn captures_response_body(&self) -> bool {
        self.capture_response_body
    }

    /// Body ceiling in characters.
    pub fn get_max_body_size(&self) -> usize {
        self.max_body_size
    }

    /// Check if an activity on `path` should be captured.
    pub fn should_capture(&self, path: &str) -> bool {
        self.endpoints.should_capture(path)
    }

    /// Check if a body with this content type may be read.
    pub fn is_capturable_content_type(&self, content_type: Option<&str>) -> bool {
        let Some(content_type) = content_type.filter(|ct| !ct.trim().is_empty()) else {
            return false;
        };
        let ct_lower = content_type.to_lowercase();
        self.allowed_content_types.iter().any(|allowed| {
            match allowed.strip_suffix("/*") {
                Some(major) => ct_lower.trim_start().starts_with(&format!("{major}/")),
                None => ct_lower.contains(allowed.as_str()),
            }
        })
    }
}

#[cfg(feature = "config")]
mod env {
    use super::{CaptureConfig, RuntimeConfig};
    use crate::error::ConfigError;
    use serde::Deserialize;
    use std::time::Duration;

    /// Prefix of every environment variable read by reqlog.
    pub const ENV_PREFIX: &str = "REQLOG_";

    #[derive(Debug, Default, Deserialize)]
    struct EnvSettings {
        enabled: Option<bool>,
        buffer_capacity: Option<usize>,
        batch_size: Option<usize>,
        flush_interval_ms: Option<u64>,
        capture_request_body: Option<bool>,
        capture_response_body: Option<bool>,
        max_body_size: Option<usize>,
    }

    fn read() -> Result<EnvSettings, ConfigError> {
        Ok(envy::prefixed(ENV_PREFIX).from_env::<EnvSettings>()?)
    }

    /// Load a `.env` file into the process environment, if present.
    pub fn load_dotenv() {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                tracing::warn!(error = %e, "failed to load .env file");
            }
        }
    }

    impl RuntimeConfig {
        /// Load from `REQLOG_*` variables over the defaults, then validate.
        ///
        /// Reads `REQLOG_ENABLED`, `REQLOG_BUFFER_CAPACITY`,
        /// `REQLOG_BATCH_SIZE` and `REQLOG_FLUSH_INTERVAL_MS`.
        pub fn from_env() -> Result<Self, ConfigError> {
            let env = read()?;
            let mut config = Self::new();
            if let Some(enabled) = env.enabled {
                config.enabled = enabled;
            }
            if let Some(capacity) = env.buffer_capacity {
                config.buffer_capacity = capacity;
            }
            if let Some(batch_size) = env.batch_size {
                config.batch_size = batch_size;
            }
            if let Some(ms) = env.flush_interval_ms {
                config.flush_interval = Duration::from_millis(ms);
            }
            config.validate()?;
            Ok(config)
        }
    }

    impl CaptureConfig {
        /// Load from `REQLOG_*` variables over the defaults.
        ///
        /// Reads `REQLOG_CAPTURE_REQUEST_BODY`,
        /// `REQLOG_CAPTURE_RESPONSE_BODY` and `REQLOG_MAX_BODY_SIZE`.
        pub fn from_env() -> Result<Self, ConfigError> {
            let env = read()?;
            let mut config = Self::new();
            if let Some(capture) = env.capture_request_body {
                config.capture_request_body = capture;
            }
            if let Some(capture) = env.capture_response_body {
                config.capture_response_body = capture;
            }
            if let Some(size) = env.max_body_size {
                config.max_body_size = size;
            }
            Ok(config)
        }
    }

}

#[cfg(feature = "config")]
pub use env::{load_dotenv, ENV_PREFIX};
