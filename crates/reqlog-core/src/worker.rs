//! Dispatch worker: drains the buffer and fans batches out to sinks.
//!
//! A single worker task consumes the [`RecordBuffer`]. Each cycle it drains
//! one batch and delivers it to every sink in registration order, record by
//! record. The first failing record aborts the rest of the batch for that
//! sink only; other sinks still receive the whole batch. There is no retry.
//!
//! ```text
//! Idle -> Draining -> Sleeping -> Draining -> ... -> Draining (final) -> Stopped
//! ```

use crate::buffer::RecordBuffer;
use crate::config::RuntimeConfig;
use crate::error::SinkError;
use crate::record::Record;
use crate::sink::Sink;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Lifecycle of the dispatch worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    /// Created, not yet running.
    #[default]
    Idle,
    /// Delivering a batch.
    Draining,
    /// Waiting for the next flush interval.
    Sleeping,
    /// Final flush done; the worker will not run again.
    Stopped,
}

/// The consumer side of the pipeline.
pub struct DispatchWorker {
    buffer: Arc<RecordBuffer>,
    sinks: Arc<[Arc<dyn Sink>]>,
    batch_size: usize,
    flush_interval: Duration,
    state: watch::Sender<WorkerState>,
}

impl DispatchWorker {
    /// Create a worker over `buffer` delivering to `sinks`.
    pub fn new(
        buffer: Arc<RecordBuffer>,
        sinks: Arc<[Arc<dyn Sink>]>,
        config: &RuntimeConfig,
    ) -> Self {
        let (state, _) = watch::channel(WorkerState::Idle);
        Self {
            buffer,
            sinks,
            batch_size: config.batch_size.max(1),
            flush_interval: config.flush_interval,
            state,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Receiver observing state transitions.
    pub fn subscribe_state(&self) -> watch::Receiver<WorkerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: WorkerState) {
        self.state.send_replace(state);
    }

    /// Drain one batch and deliver it. Returns the batch size.
    pub async fn drain_once(&self) -> usize {
        let batch = self.buffer.dequeue_batch(self.batch_size);
        if batch.is_empty() {
            return 0;
        }
        debug!(records = batch.len(), "dispatching batch");
        self.dispatch(&batch).await;
        batch.len()
    }

    /// Deliver everything buffered right now, in batches.
    ///
    /// Records enqueued while this runs are left for nobody; the caller is
    /// expected to have stopped producers.
    pub async fn flush_remaining(&self) -> usize {
        let mut remaining = self.buffer.len();
        let mut delivered = 0;
        while remaining > 0 {
            let batch = self.buffer.dequeue_batch(self.batch_size.min(remaining));
            if batch.is_empty() {
                break;
            }
            remaining -= batch.len();
            delivered += batch.len();
            self.dispatch(&batch).await;
        }
        delivered
    }

    /// Deliver `batch` to every sink, isolating failures per sink.
    pub async fn dispatch(&self, batch: &[Record]) {
        for sink in self.sinks.iter() {
            deliver_batch(sink.as_ref(), batch).await;
        }
    }

    /// Run until `shutdown` flips to `true` (or its sender is dropped),
    /// then perform one final flush.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            batch_size = self.batch_size,
            flush_interval_ms = self.flush_interval.as_millis() as u64,
            sinks = self.sinks.len(),
            "dispatch worker started"
        );

        loop {
            if *shutdown.borrow_and_update() {
                break;
            }

            self.set_state(WorkerState::Draining);
            self.drain_once().await;

            self.set_state(WorkerState::Sleeping);
            tokio::select! {
                _ = tokio::time::sleep(self.flush_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        self.set_state(WorkerState::Draining);
        let flushed = self.flush_remaining().await;
        self.set_state(WorkerState::Stopped);
        info!(flushed, "dispatch worker stopped");
    }
}

impl std::fmt::Debug for DispatchWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatchWorker")
            .field("batch_size", &self.batch_size)
            .field("flush_interval", &self.flush_interval)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("state", &self.state())
            .finish()
    }
}

/// Deliver a batch to one sink, stopping at the first failure.
///
/// A panicking sink is treated like a failing one.
async fn deliver_batch(sink: &dyn Sink, batch: &[Record]) -> bool {
    for (index, record) in batch.iter().enumerate() {
        let outcome = AssertUnwindSafe(sink.deliver(record))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(SinkError::Backend("sink panicked".to_string())));

        if let Err(error) = outcome {
            warn!(
                sink = sink.name(),
                error = %error,
                skipped = batch.len() - index,
                "sink delivery failed, rest of batch skipped"
            );
            return false;
        }
    }
    true
}
