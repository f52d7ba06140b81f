//! # reqlog
//!
//! Request logging for HTTP services that never slows the request path down.
//!
//! Each request/response cycle becomes a [`Record`]: classified by
//! [`Severity`], stripped of credentials and personal data, and handed to a
//! bounded in-memory buffer. A background worker drains the buffer in batches
//! and ships records to every registered [`Sink`]; one broken destination
//! never starves the others.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use reqlog::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let runtime = Runtime::builder()
//!         .sink(ConsoleSink::stdout(ConsoleFormat::Pretty))
//!         .build()?;
//!     runtime.start().await?;
//!
//!     let layer = RecordLayer::new(runtime.handle(), CaptureConfig::new());
//!     // ... wrap your tower service with `layer` and serve ...
//!
//!     runtime.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `tower` (default) - [`RecordLayer`] middleware for `tower` services
//! - `config` - Load configuration from `REQLOG_*` environment variables
//! - `redis` - `RedisSink` pushing records onto a Redis list
//! - `postgres` - `PostgresSink` writing records to a PostgreSQL table
//! - `full` - All optional features enabled

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

// Re-export the pipeline
pub use reqlog_core::*;

/// Record destinations.
pub mod sinks {
    pub use reqlog_sinks::*;
}

#[cfg(feature = "tower")]
pub mod layer;

#[cfg(feature = "tower")]
pub use layer::{RecordLayer, RecordService};

/// Prelude module - import everything you need with `use reqlog::prelude::*`
pub mod prelude {
    pub use reqlog_core::{
        ActivityTimer, CaptureConfig, EndpointFilter, ErrorKind, ExceptionCapture,
        ExceptionMatcher, ExceptionSummary, Record, RecordBuilder, RedactionPolicy, Runtime,
        RuntimeConfig, RuntimeHandle, Severity, SeverityOverrides, Sink, SinkError, SinkResult,
    };
    pub use reqlog_sinks::{ConsoleFormat, ConsoleSink, FileSink, TracingSink};

    #[cfg(feature = "redis")]
    pub use reqlog_sinks::RedisSink;

    #[cfg(feature = "postgres")]
    pub use reqlog_sinks::PostgresSink;

    #[cfg(feature = "tower")]
    pub use crate::layer::RecordLayer;

    pub use async_trait::async_trait;
}
