//! Sensitive-data redaction for headers and JSON bodies.
//!
//! Redaction is pure: given a [`RedactionPolicy`] and raw input it returns a
//! sanitized copy. Bodies are truncated before they are masked, so a body
//! cut in the middle of a JSON document simply fails to parse and is kept as
//! truncated text.

use crate::record::BodySummary;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

/// Marker written in place of masked values by the default mask.
pub const MASK: &str = "***";

/// Function turning a sensitive value into its masked form.
pub type MaskFn = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// What to mask, and how.
///
/// Field and header names are compared case-insensitively.
///
/// ```
/// use reqlog_core::redact::RedactionPolicy;
///
/// let policy = RedactionPolicy::new()
///     .mask_field("ssn")
///     .mask_header("x-api-key");
///
/// let body = policy.sanitize_body(r#"{"user":{"ssn":"123"}}"#, 1024);
/// assert_eq!(body.raw.as_deref(), Some(r#"{"user":{"ssn":"***"}}"#));
/// ```
#[derive(Clone)]
pub struct RedactionPolicy {
    pub(crate) enabled: bool,
    pub(crate) fields: HashSet<String>,
    pub(crate) headers: HashSet<String>,
    pub(crate) mask: MaskFn,
}

impl Default for RedactionPolicy {
    fn default() -> Self {
        Self::new()
    }
}

impl RedactionPolicy {
    /// Create a policy with the default field and header sets.
    ///
    /// Fields: `password`, `token`, `access_token`, `refresh_token`, `cpf`,
    /// `cnpj`. Headers: `authorization`, `cookie`, `set-cookie`.
    pub fn new() -> Self {
        let fields = ["password", "token", "access_token", "refresh_token", "cpf", "cnpj"]
            .into_iter()
            .map(str::to_string)
            .collect();
        let headers = ["authorization", "cookie", "set-cookie"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Self {
            enabled: true,
            fields,
            headers,
            mask: Arc::new(|_| MASK.to_string()),
        }
    }

    /// A policy that passes everything through untouched.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::new()
        }
    }

    /// Enable or disable redaction.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Add a JSON field name to mask.
    pub fn mask_field(mut self, field: impl Into<String>) -> Self {
        self.fields.insert(field.into().to_lowercase());
        self
    }

    /// Add several JSON field names to mask.
    pub fn mask_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.fields
            .extend(fields.into_iter().map(|f| f.into().to_lowercase()));
        self
    }

    /// Add a header name to mask.
    pub fn mask_header(mut self, header: impl Into<String>) -> Self {
        self.headers.insert(header.into().to_lowercase());
        self
    }

    /// Add several header names to mask.
    pub fn mask_headers(mut self, headers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.headers
            .extend(headers.into_iter().map(|h| h.into().to_lowercase()));
        self
    }

    /// Replace the mask function.
    ///
    /// The function receives the original value (JSON text for non-string
    /// body values) and returns its replacement.
    pub fn with_mask<F>(mut self, mask: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.mask = Arc::new(mask);
        self
    }

    /// Whether redaction is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check if a JSON field name is masked.
    pub fn is_masked_field(&self, name: &str) -> bool {
        self.fields.contains(&name.to_lowercase())
    }

    /// Check if a header name is masked.
    pub fn is_masked_header(&self, name: &str) -> bool {
        self.headers.contains(&name.to_lowercase())
    }

    /// Sanitize one header value.
    ///
    /// A bearer `Authorization` value keeps its scheme (`Bearer ***`).
    pub fn sanitize_header(&self, name: &str, value: &str) -> String {
        if !self.enabled || !self.is_masked_header(name) {
            return value.to_string();
        }

        if name.eq_ignore_ascii_case("authorization") {
            if let Some(credentials) = value.strip_prefix("Bearer ") {
                return format!("Bearer {}", (self.mask)(credentials));
            }
        }

        (self.mask)(value)
    }

    /// Sanitize a collection of header name/value pairs.
    pub fn sanitize_headers<I, K, V>(&self, headers: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        headers
            .into_iter()
            .map(|(name, value)| {
                let name = name.as_ref();
                (name.to_string(), self.sanitize_header(name, value.as_ref()))
            })
            .collect()
    }

    /// Sanitize an [`http::HeaderMap`].
    ///
    /// Values that are not visible ASCII are skipped. Repeated headers are
    /// joined with `, `.
    pub fn sanitize_header_map(&self, headers: &http::HeaderMap) -> HashMap<String, String> {
        let mut sanitized: HashMap<String, String> = HashMap::new();
        for (name, value) in headers.iter() {
            let Ok(value) = value.to_str() else {
                continue;
            };
            let value = self.sanitize_header(name.as_str(), value);
            sanitized
                .entry(name.as_str().to_string())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }
        sanitized
    }

    /// Truncate a body to `max_chars` characters, then mask it.
    pub fn sanitize_body(&self, raw: &str, max_chars: usize) -> BodySummary {
        let (text, size, truncated) = truncate_chars(raw, max_chars);

        let raw = if self.enabled {
            self.mask_json(text)
        } else {
            text.to_string()
        };

        BodySummary {
            raw: Some(raw),
            size,
            truncated,
        }
    }

    /// Mask a JSON document. Text that is not valid JSON is returned as is.
    pub fn mask_json(&self, text: &str) -> String {
        match serde_json::from_str::<Value>(text) {
            Ok(mut value) => {
                self.mask_value(&mut value);
                serde_json::to_string(&value).unwrap_or_else(|_| text.to_string())
            }
            Err(_) => text.to_string(),
        }
    }

    /// Recursively mask every matching key in a JSON value.
    pub fn mask_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, v) in map.iter_mut() {
                    if self.is_masked_field(key) {
                        let original = match &*v {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        *v = Value::String((self.mask)(&original));
                    } else {
                        self.mask_value(v);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.mask_value(item);
                }
            }
            _ => {}
        }
    }
}

impl fmt::Debug for RedactionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedactionPolicy")
            .field("enabled", &self.enabled)
            .field("fields", &self.fields)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Cut `text` to at most `max_chars` characters.
///
/// Returns the kept slice, its length in characters, and whether anything
/// was cut.
fn truncate_chars(text: &str, max_chars: usize) -> (&str, usize, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], max_chars, true),
        None => (text, text.chars().count(), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_bearer_keeps_scheme() {
        let policy = RedactionPolicy::new();
        assert_eq!(
            policy.sanitize_header("Authorization", "Bearer abc.def.ghi"),
            "Bearer ***"
        );
        assert_eq!(policy.sanitize_header("authorization", "Basic dXNlcg=="), "***");
        assert_eq!(policy.sanitize_header("Cookie", "session=1"), "***");
        assert_eq!(
            policy.sanitize_header("content-type", "application/json"),
            "application/json"
        );
    }

    #[test]
    fn test_disabled_policy_passes_through() {
        let policy = RedactionPolicy::disabled();
        assert_eq!(policy.sanitize_header("authorization", "Bearer x"), "Bearer x");

        let body = policy.sanitize_body(r#"{"password":"x"}"#, 100);
        assert_eq!(body.raw.as_deref(), Some(r#"{"password":"x"}"#));
    }

    #[test]
    fn test_header_map_sanitization() {
        let mut headers = http::HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, "Bearer secret".parse().unwrap());
        headers.insert(http::header::ACCEPT, "text/plain".parse().unwrap());
        headers.append(http::header::SET_COOKIE, "a=1".parse().unwrap());
        headers.append(http::header::SET_COOKIE, "b=2".parse().unwrap());

        let sanitized = RedactionPolicy::new().sanitize_header_map(&headers);
        assert_eq!(sanitized["authorization"], "Bearer ***");
        assert_eq!(sanitized["accept"], "text/plain");
        assert_eq!(sanitized["set-cookie"], "***, ***");
    }

    #[test]
    fn test_masking_is_deep() {
        let policy = RedactionPolicy::new();
        let body = policy.sanitize_body(r#"{"a":{"b":{"password":"x","keep":1}},"c":"y"}"#, 1000);
        let value: Value = serde_json::from_str(body.raw.as_deref().unwrap()).unwrap();

        assert_eq!(value["a"]["b"]["password"], "***");
        assert_eq!(value["a"]["b"]["keep"], 1);
        assert_eq!(value["c"], "y");
        assert!(!body.truncated);
    }

    #[test]
    fn test_masking_replaces_any_value_type() {
        let policy = RedactionPolicy::new().mask_field("card");
        let mut value = json!({
            "card": {"number": "4111", "cvv": 123},
            "items": [{"TOKEN": [1, 2]}, {"name": "ok"}]
        });
        policy.mask_value(&mut value);

        assert_eq!(value["card"], "***");
        assert_eq!(value["items"][0]["TOKEN"], "***");
        assert_eq!(value["items"][1]["name"], "ok");
    }

    #[test]
    fn test_key_order_preserved() {
        let policy = RedactionPolicy::new();
        let masked = policy.mask_json(r#"{"z":1,"password":"p","a":2}"#);
        assert_eq!(masked, r#"{"z":1,"password":"***","a":2}"#);
    }

    #[test]
    fn test_truncation_precedes_masking() {
        let policy = RedactionPolicy::new();
        let raw = r#"{"password":"secret-value"}"#;
        let body = policy.sanitize_body(raw, 15);

        assert!(body.truncated);
        assert_eq!(body.size, 15);
        assert_eq!(body.raw.as_deref(), Some(r#"{"password":"se"#));
    }

    #[test]
    fn test_plain_text_body_kept() {
        let body = RedactionPolicy::new().sanitize_body("password=hunter2", 100);
        assert_eq!(body.raw.as_deref(), Some("password=hunter2"));
        assert_eq!(body.size, 16);
    }

    #[test]
    fn test_truncation_counts_chars() {
        let body = RedactionPolicy::disabled().sanitize_body("héllo wörld", 5);
        assert_eq!(body.raw.as_deref(), Some("héllo"));
        assert_eq!(body.size, 5);
        assert!(body.truncated);

        let exact = RedactionPolicy::disabled().sanitize_body("héllo", 5);
        assert!(!exact.truncated);
    }

    #[test]
    fn test_custom_mask() {
        let policy = RedactionPolicy::new().with_mask(|v| format!("<{} chars>", v.len()));
        let masked = policy.mask_json(r#"{"token":"abcd"}"#);
        assert_eq!(masked, r#"{"token":"<4 chars>"}"#);
    }

    #[test]
    fn test_custom_mask_sees_non_string_values() {
        let policy = RedactionPolicy::new()
            .mask_field("pin")
            .mask_field("secret")
            .with_mask(|v| format!("<{}>", v));
        let mut value = json!({"pin": 1234, "secret": {"a": true}, "token": "t"});
        policy.mask_value(&mut value);

        assert_eq!(value["pin"], "<1234>");
        assert_eq!(value["secret"], r#"<{"a":true}>"#);
        assert_eq!(value["token"], "<t>");
    }

    proptest! {
        #[test]
        fn prop_header_sanitization_idempotent(
            headers in prop::collection::hash_map(
                prop::sample::select(vec![
                    "authorization", "Authorization", "cookie", "set-cookie",
                    "accept", "content-type", "x-request-id",
                ]).prop_map(str::to_string),
                "(Bearer )?[a-zA-Z0-9*]{0,12}",
                0..7,
            )
        ) {
            let policy = RedactionPolicy::new();
            let once = policy.sanitize_headers(&headers);
            let twice = policy.sanitize_headers(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn prop_truncated_size_equals_ceiling(text in ".{0,64}", max in 0usize..32) {
            let body = RedactionPolicy::disabled().sanitize_body(&text, max);
            if body.truncated {
                prop_assert_eq!(body.size, max);
                prop_assert_eq!(body.raw.as_deref().unwrap().chars().count(), max);
            } else {
                prop_assert!(body.size <= max);
            }
        }
    }
}
