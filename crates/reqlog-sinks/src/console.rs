//! Console destination.
//!
//! Writes every record either as a single JSON line or as a multi-line,
//! human-oriented block whose marker is coloured by status class.

use async_trait::async_trait;
use console::style;
use reqlog_core::{BodySummary, Record, Sink, SinkError, SinkResult};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::Mutex;

/// Output layout of a [`ConsoleSink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConsoleFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line block for local development.
    Pretty,
}

/// Sink printing records to stdout, stderr or any writer.
pub struct ConsoleSink {
    format: ConsoleFormat,
    colors: bool,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleSink {
    /// Print to standard output.
    pub fn stdout(format: ConsoleFormat) -> Self {
        Self::with_writer(format, io::stdout()).colors(console::colors_enabled())
    }

    /// Print to standard error.
    pub fn stderr(format: ConsoleFormat) -> Self {
        Self::with_writer(format, io::stderr()).colors(console::colors_enabled_stderr())
    }

    /// Print to an arbitrary writer. Colours are off.
    pub fn with_writer<W: Write + Send + 'static>(format: ConsoleFormat, writer: W) -> Self {
        Self {
            format,
            colors: false,
            writer: Mutex::new(Box::new(writer)),
        }
    }

    /// Force colours on or off for the pretty format.
    pub fn colors(mut self, enabled: bool) -> Self {
        self.colors = enabled;
        self
    }

    /// The configured layout.
    pub fn format(&self) -> ConsoleFormat {
        self.format
    }

    fn render(&self, record: &Record) -> SinkResult<String> {
        match self.format {
            ConsoleFormat::Json => {
                let mut line = record.to_json_line()?;
                line.push('\n');
                Ok(line)
            }
            ConsoleFormat::Pretty => Ok(format_pretty(record, self.colors)),
        }
    }
}

impl std::fmt::Debug for ConsoleSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleSink")
            .field("format", &self.format)
            .field("colors", &self.colors)
            .finish()
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    fn name(&self) -> &str {
        "console"
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        let text = self.render(record)?;
        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

/// Render a record as a multi-line block.
///
/// Absent sections (headers, bodies, exception) are omitted.
pub fn format_pretty(record: &Record, colors: bool) -> String {
    let marker = style("●").force_styling(colors);
    let marker = match record.status {
        500.. => marker.red(),
        400..=499 => marker.yellow(),
        300..=399 => marker.magenta(),
        _ => marker.green(),
    };

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}",
        marker,
        style("[HTTP REQUEST]").force_styling(colors).bold()
    );
    let _ = writeln!(out, "   {:<6} {}", record.method, record.path);
    let _ = writeln!(out, "   Status       : {}", record.status);
    let _ = writeln!(out, "   Severity     : {}", record.severity);
    let _ = writeln!(out, "   Duration     : {:.2} ms", record.duration_ms);
    let _ = writeln!(out, "   Correlation  : {}", record.correlation_id);
    if let Some(addr) = &record.client_addr {
        let _ = writeln!(out, "   IP           : {}", addr);
    }
    if let Some(ct) = record.content_type.as_deref().filter(|c| !c.trim().is_empty()) {
        let _ = writeln!(out, "   Content-Type : {}", ct);
    }

    append_headers(&mut out, "Request Headers", record.request_headers.as_ref());
    append_body(&mut out, "Request Body", record.request_body.as_ref());
    append_headers(&mut out, "Response Headers", record.response_headers.as_ref());
    append_body(&mut out, "Response Body", record.response_body.as_ref());

    if let Some(message) = record
        .exception
        .as_ref()
        .and_then(|e| e.message.as_deref())
        .filter(|m| !m.trim().is_empty())
    {
        let _ = writeln!(out, "   Exception    : {}", message);
    }
    out
}

fn append_headers(out: &mut String, title: &str, headers: Option<&HashMap<String, String>>) {
    let Some(headers) = headers.filter(|h| !h.is_empty()) else {
        return;
    };

    let mut names: Vec<_> = headers.keys().collect();
    names.sort();

    let _ = writeln!(out, "\n   -- {} --", title);
    for name in names {
        let _ = writeln!(out, "   {:<14}: {}", name, headers[name]);
    }
}

fn append_body(out: &mut String, title: &str, body: Option<&BodySummary>) {
    let Some((body, raw)) = body.and_then(|b| {
        b.raw
            .as_deref()
            .filter(|r| !r.trim().is_empty())
            .map(|r| (b, r))
    }) else {
        return;
    };

    let _ = writeln!(out, "\n   -- {} --", title);
    for line in raw.lines() {
        let _ = writeln!(out, "   {}", line);
    }
    if body.truncated {
        let _ = writeln!(out, "   (body truncated)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog_core::{CaptureConfig, ExceptionSummary, RecordBuilder};
    use std::sync::Arc;

    /// Writer whose contents stay readable after being moved into a sink.
    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_json_lines() {
        let buf = SharedBuf::default();
        let sink = ConsoleSink::with_writer(ConsoleFormat::Json, buf.clone());

        sink.deliver(&RecordBuilder::new("GET", "/a").build()).await.unwrap();
        sink.deliver(&RecordBuilder::new("GET", "/b").status(404).build())
            .await
            .unwrap();

        let output = buf.contents();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["status"], 404);
        assert_eq!(second["severity"], "error");
    }

    #[test]
    fn test_pretty_format() {
        let config = CaptureConfig::new().capture_request_body(true);
        let mut headers = http::HeaderMap::new();
        headers.insert("x-trace", http::HeaderValue::from_static("1"));
        let record = RecordBuilder::with_config(&config, "POST", "/login")
            .status(500)
            .client_addr("10.0.0.1")
            .correlation_id("abc")
            .request_headers(&headers)
            .request_body(Some("application/json"), r#"{"password":"x"}"#)
            .exception(ExceptionSummary::new("Db", "connection refused"))
            .build();

        let text = format_pretty(&record, false);
        assert!(text.starts_with("● [HTTP REQUEST]\n"));
        assert!(text.contains("   POST   /login\n"));
        assert!(text.contains("   Status       : 500\n"));
        assert!(text.contains("   Severity     : critical\n"));
        assert!(text.contains("   Correlation  : abc\n"));
        assert!(text.contains("   IP           : 10.0.0.1\n"));
        assert!(text.contains("-- Request Headers --"));
        assert!(text.contains("   x-trace       : 1\n"));
        assert!(text.contains(r#"   {"password":"***"}"#));
        assert!(text.contains("   Exception    : connection refused\n"));
        assert!(!text.contains("Response Body"));
    }

    #[test]
    fn test_pretty_marks_truncation() {
        let config = CaptureConfig::new()
            .capture_response_body(true)
            .max_body_size(4);
        let record = RecordBuilder::with_config(&config, "GET", "/big")
            .response_body(Some("application/json"), "[1,2,3,4,5]")
            .build();

        let text = format_pretty(&record, false);
        assert!(text.contains("-- Response Body --\n   [1,2\n   (body truncated)\n"));
    }

    #[test]
    fn test_colors_only_when_forced() {
        let record = RecordBuilder::new("GET", "/").status(503).build();
        assert!(!format_pretty(&record, false).contains('\u{1b}'));
        assert!(format_pretty(&record, true).contains('\u{1b}'));
    }
}
