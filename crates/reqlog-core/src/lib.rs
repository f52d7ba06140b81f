//! # reqlog-core
//!
//! Capture-buffer-dispatch pipeline for HTTP request records.
//!
//! Request handlers build a [`Record`] per request/response cycle and submit
//! it to a [`Runtime`]. Submission only touches an in-memory bounded buffer
//! that drops the oldest records on overflow. A single background worker
//! drains the buffer in batches and hands every batch to each registered
//! [`Sink`], isolating sink failures from each other.
//!
//! Records are classified ([`Severity`]) and sanitized ([`RedactionPolicy`])
//! before they enter the buffer.
//!
//! ## Features
//!
//! - `config` - Load [`RuntimeConfig`] and [`CaptureConfig`] from `REQLOG_*`
//!   environment variables and `.env` files
//!
//! ## Example
//!
//! ```rust,no_run
//! use reqlog_core::{CaptureConfig, MemorySink, RecordBuilder, Runtime};
//!
//! # async fn demo() -> reqlog_core::Result<()> {
//! let runtime = Runtime::builder().sink(MemorySink::new()).build()?;
//! runtime.start().await?;
//!
//! let capture = CaptureConfig::new();
//! runtime.submit(
//!     RecordBuilder::with_config(&capture, "GET", "/health")
//!         .status(200)
//!         .build(),
//! );
//!
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod capture;
pub mod classify;
pub mod config;
pub mod error;
pub mod exception;
pub mod record;
pub mod redact;
pub mod runtime;
pub mod sink;
pub mod worker;

pub use buffer::{BufferStats, RecordBuffer};
pub use capture::{ActivityTimer, RecordBuilder};
pub use classify::{status_ladder, ExceptionMatcher, ExceptionPredicate, SeverityOverrides};
pub use config::{CaptureConfig, EndpointFilter, RuntimeConfig};
pub use error::{ConfigError, Error, Result, SinkError, SinkResult};
pub use exception::{ErrorKind, ExceptionCapture, ExceptionSummary, MAX_EXCEPTION_DEPTH};
pub use record::{BodySummary, Record, Severity};
pub use redact::{MaskFn, RedactionPolicy, MASK};
pub use runtime::{Runtime, RuntimeBuilder, RuntimeHandle};
pub use sink::{MemorySink, Sink};
pub use worker::{DispatchWorker, WorkerState};

#[cfg(feature = "config")]
pub use config::{load_dotenv, ENV_PREFIX};
