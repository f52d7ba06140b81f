//! Structured-logger destination.
//!
//! Emits one `tracing` event per record under the `reqlog` target, so records
//! end up wherever the host's subscriber sends its logs.

use async_trait::async_trait;
use reqlog_core::{Record, Severity, Sink, SinkResult};

/// Target of every event emitted by [`TracingSink`].
pub const TARGET: &str = "reqlog";

/// Sink forwarding records to the active `tracing` subscriber.
///
/// | Severity   | Level   |
/// |------------|---------|
/// | `Info`     | `INFO`  |
/// | `Warning`  | `WARN`  |
/// | `Error`    | `ERROR` |
/// | `Critical` | `ERROR` with `critical = true` |
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl TracingSink {
    /// Create the sink.
    pub fn new() -> Self {
        Self
    }

    /// Emit the event for one record.
    pub fn emit(&self, record: &Record) {
        let exception = record
            .exception
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_default();

        macro_rules! emit_at {
            ($level:ident, $critical:expr) => {
                tracing::$level!(
                    target: TARGET,
                    method = %record.method,
                    path = %record.path,
                    status = record.status,
                    duration_ms = record.duration_ms,
                    correlation_id = %record.correlation_id,
                    severity = %record.severity,
                    critical = $critical,
                    exception = %exception,
                    "{} {} -> {}",
                    record.method,
                    record.path,
                    record.status
                )
            };
        }

        match record.severity {
            Severity::Info => emit_at!(info, false),
            Severity::Warning => emit_at!(warn, false),
            Severity::Error => emit_at!(error, false),
            Severity::Critical => emit_at!(error, true),
        }
    }
}

#[async_trait]
impl Sink for TracingSink {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        self.emit(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqlog_core::{ExceptionSummary, RecordBuilder};
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> String {
        let out = Captured::default();
        let writer = out.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = out.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_levels_follow_severity() {
        let sink = TracingSink::new();
        let output = capture(|| {
            sink.emit(&RecordBuilder::new("GET", "/ok").status(200).build());
            sink.emit(&RecordBuilder::new("GET", "/moved").status(301).build());
            sink.emit(&RecordBuilder::new("GET", "/boom").status(503).build());
        });

        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("INFO") && lines[0].contains("GET /ok -> 200"));
        assert!(lines[1].contains("WARN"));
        assert!(lines[2].contains("ERROR") && lines[2].contains("critical=true"));
    }

    #[test]
    fn test_exception_is_attached() {
        let sink = TracingSink::new();
        let record = RecordBuilder::new("POST", "/pay")
            .status(500)
            .exception(ExceptionSummary::new("Gateway", "card declined"))
            .build();
        let output = capture(|| sink.emit(&record));

        assert!(output.contains("Gateway: card declined"));
        assert!(output.contains("reqlog"));
    }
}
