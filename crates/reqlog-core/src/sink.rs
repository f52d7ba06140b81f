//! The sink capability: where records end up.

use crate::error::{SinkError, SinkResult};
use crate::record::Record;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// Destination for records.
///
/// Sinks are invoked from the single dispatch worker task, one record at a
/// time, in the order records were drained. A sink never receives a mutable
/// record.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    /// Short name used in diagnostics.
    fn name(&self) -> &str;

    /// Deliver one record.
    async fn deliver(&self, record: &Record) -> SinkResult<()>;

    /// One-time setup run before the first delivery (create a table, open a
    /// connection, ...). A failure aborts pipeline startup.
    async fn initialize(&self) -> SinkResult<()> {
        Ok(())
    }
}

#[async_trait]
impl<S: Sink + ?Sized> Sink for Arc<S> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        (**self).deliver(record).await
    }

    async fn initialize(&self) -> SinkResult<()> {
        (**self).initialize().await
    }
}

/// In-memory sink keeping every delivered record (for tests and dev).
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<Record>>>,
}

impl MemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the records delivered so far.
    pub fn records(&self) -> Vec<Record> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Number of records delivered so far.
    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Check if nothing was delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl Sink for MemorySink {
    fn name(&self) -> &str {
        "memory"
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SinkError::Unavailable("Lock poisoned".to_string()))?;
        records.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample;

    #[tokio::test]
    async fn test_memory_sink_collects() {
        let sink = MemorySink::new();
        assert!(sink.is_empty());

        sink.deliver(&sample("/a", 200)).await.unwrap();
        sink.deliver(&sample("/b", 500)).await.unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].path, "/b");
    }

    #[tokio::test]
    async fn test_arc_sink_delegates() {
        let sink = Arc::new(MemorySink::new());
        let shared: Arc<dyn Sink> = Arc::new(Arc::clone(&sink));

        shared.initialize().await.unwrap();
        shared.deliver(&sample("/a", 200)).await.unwrap();

        assert_eq!(shared.name(), "memory");
        assert_eq!(sink.len(), 1);
    }
}
