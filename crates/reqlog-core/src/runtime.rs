//! The pipeline facade.
//!
//! A [`Runtime`] owns the buffer, the registered sinks and the dispatch
//! worker task. Producers submit through it (or through a cheap
//! [`RuntimeHandle`]); submission never blocks on I/O and never fails.
//!
//! # Example
//!
//! ```rust,no_run
//! use reqlog_core::{MemorySink, RecordBuilder, Runtime, RuntimeConfig};
//!
//! # async fn demo() -> reqlog_core::Result<()> {
//! let runtime = Runtime::builder()
//!     .config(RuntimeConfig::new().batch_size(50))
//!     .sink(MemorySink::new())
//!     .build()?;
//! runtime.start().await?;
//!
//! let handle = runtime.handle();
//! handle.submit(RecordBuilder::new("GET", "/users").status(200).build());
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

use crate::buffer::{BufferStats, RecordBuffer};
use crate::config::RuntimeConfig;
use crate::error::{ConfigError, Error, Result};
use crate::record::Record;
use crate::sink::Sink;
use crate::worker::{DispatchWorker, WorkerState};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, OnceCell};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Builder for [`Runtime`].
#[derive(Default)]
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    sinks: Vec<Arc<dyn Sink>>,
}

impl RuntimeBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a sink. Sinks receive batches in registration order.
    pub fn sink<S: Sink>(mut self, sink: S) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    /// Register an already shared sink.
    pub fn shared_sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Validate the configuration and create the runtime.
    ///
    /// Nothing is spawned until [`Runtime::start`].
    pub fn build(self) -> std::result::Result<Runtime, ConfigError> {
        self.config.validate()?;

        let (shutdown, _) = watch::channel(false);
        Ok(Runtime {
            buffer: Arc::new(RecordBuffer::new(self.config.buffer_capacity)),
            sinks: self.sinks.into(),
            config: self.config,
            initialized: OnceCell::new(),
            shutdown,
            worker: Mutex::new(None),
        })
    }
}

struct WorkerTask {
    handle: JoinHandle<()>,
    state: watch::Receiver<WorkerState>,
}

/// The capture-buffer-dispatch pipeline.
pub struct Runtime {
    config: RuntimeConfig,
    buffer: Arc<RecordBuffer>,
    sinks: Arc<[Arc<dyn Sink>]>,
    initialized: OnceCell<()>,
    shutdown: watch::Sender<bool>,
    worker: Mutex<Option<WorkerTask>>,
}

impl Runtime {
    /// Start building a runtime.
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::default()
    }

    /// The configuration in use.
    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Submit a record. Never blocks on I/O, never fails.
    ///
    /// When the pipeline is disabled the record is discarded.
    pub fn submit(&self, record: Record) {
        if self.config.enabled {
            self.buffer.enqueue(record);
        }
    }

    /// A cloneable handle that can only submit.
    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle {
            buffer: Arc::clone(&self.buffer),
            enabled: self.config.enabled,
        }
    }

    /// Run every sink's one-time setup, sequentially, in registration order.
    ///
    /// Succeeds at most once; later calls return immediately. A failing
    /// sink aborts setup and may be retried by calling this again.
    pub async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                for sink in self.sinks.iter() {
                    if let Err(source) = sink.initialize().await {
                        error!(sink = sink.name(), error = %source, "sink setup failed");
                        return Err(Error::SinkSetup {
                            sink: sink.name().to_string(),
                            source,
                        });
                    }
                }
                info!(sinks = self.sinks.len(), "sinks initialized");
                Ok(())
            })
            .await
            .map(|_| ())
    }

    /// Initialize the sinks and spawn the dispatch worker.
    ///
    /// Must be called from within a tokio runtime. Calling it again while
    /// the worker runs is a no-op. A disabled pipeline starts nothing.
    pub async fn start(&self) -> Result<()> {
        if !self.config.enabled {
            info!("reqlog pipeline disabled, worker not started");
            return Ok(());
        }

        self.initialize().await?;

        let handle = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let mut slot = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_some() {
            warn!("dispatch worker already started");
            return Ok(());
        }

        let worker = DispatchWorker::new(
            Arc::clone(&self.buffer),
            Arc::clone(&self.sinks),
            &self.config,
        );
        let state = worker.subscribe_state();
        let task = handle.spawn(worker.run(self.shutdown.subscribe()));
        *slot = Some(WorkerTask { handle: task, state });
        Ok(())
    }

    /// Stop the worker after one final flush of everything buffered.
    ///
    /// Returns once the final delivery attempt has completed. Records
    /// submitted afterwards stay in memory and are never delivered.
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);

        let task = self
            .worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        let Some(task) = task else {
            return;
        };

        if let Err(e) = task.handle.await {
            error!(error = %e, "dispatch worker terminated abnormally");
        }
        info!(pending = self.buffer.len(), "reqlog pipeline shut down");
    }

    /// State of the dispatch worker, if it was started and not yet joined.
    pub fn worker_state(&self) -> Option<WorkerState> {
        self.worker
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|task| *task.state.borrow())
    }

    /// Buffer counters.
    pub fn stats(&self) -> BufferStats {
        self.buffer.stats()
    }

    /// Number of records waiting for dispatch.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", &self.config)
            .field("buffer", &self.buffer)
            .field("sinks", &self.sinks.iter().map(|s| s.name()).collect::<Vec<_>>())
            .finish()
    }
}

/// Submit-only view of a [`Runtime`].
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    buffer: Arc<RecordBuffer>,
    enabled: bool,
}

impl RuntimeHandle {
    /// Submit a record. Never blocks on I/O, never fails.
    pub fn submit(&self, record: Record) {
        if self.enabled {
            self.buffer.enqueue(record);
        }
    }

    /// Whether submitted records are kept.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}
