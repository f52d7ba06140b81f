//! # reqlog-sinks
//!
//! Destinations for records produced by the reqlog pipeline.
//!
//! Every type here implements [`reqlog_core::Sink`] and can be registered
//! with [`reqlog_core::RuntimeBuilder::sink`].
//!
//! - [`ConsoleSink`] - JSON lines or a pretty, coloured block on stdout/stderr
//! - [`TracingSink`] - one `tracing` event per record
//! - [`FileSink`] - JSON lines appended to a file
//! - `RedisSink` - `RPUSH` onto a Redis list (feature `redis`)
//! - `PostgresSink` - one row per record in a PostgreSQL table (feature `postgres`)
//!
//! ## Example
//!
//! ```toml
//! [dependencies]
//! reqlog-sinks = { version = "0.1", features = ["redis"] }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod console;
pub mod file;
pub mod tracing_sink;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "redis")]
pub mod redis_sink;

pub use console::{format_pretty, ConsoleFormat, ConsoleSink};
pub use file::FileSink;
pub use tracing_sink::TracingSink;

#[cfg(feature = "postgres")]
pub use postgres::PostgresSink;
#[cfg(feature = "redis")]
pub use redis_sink::RedisSink;
