//! Error types for the reqlog pipeline.
//!
//! Only startup can fail: building a [`Runtime`](crate::Runtime) with an
//! invalid configuration, or a sink whose one-time setup fails. Delivery
//! failures are reported as [`SinkError`] to the dispatch worker, which logs
//! them and moves on.

use thiserror::Error;

/// Invalid configuration detected at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting that must be positive was zero.
    #[error("Configuration error: `{0}` must be greater than zero")]
    NotPositive(&'static str),

    /// A required parameter (connection URL, key, ...) is missing or empty.
    #[error("Missing required parameter: {0}")]
    Missing(String),

    /// A parameter is present but not acceptable.
    #[error("Invalid value for `{name}`: {reason}")]
    Invalid {
        /// Parameter name
        name: String,
        /// Why the value was rejected
        reason: String,
    },

    /// Environment variable deserialization failed.
    #[cfg(feature = "config")]
    #[error("Environment configuration error: {0}")]
    Env(#[from] envy::Error),
}

/// Error raised by a sink while delivering a record or during setup.
#[derive(Debug, Error)]
pub enum SinkError {
    /// IO error while writing.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The destination rejected the operation.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The destination is closed or unreachable.
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    /// The sink was constructed with unusable parameters.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Startup error surfaced to the host application.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid pipeline configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A sink's one-time setup failed.
    #[error("Setup failed for sink `{sink}`: {source}")]
    SinkSetup {
        /// Name of the failing sink
        sink: String,
        /// Underlying sink error
        #[source]
        source: SinkError,
    },

    /// `start` was called outside of a tokio runtime.
    #[error("No tokio runtime available to spawn the dispatch worker")]
    NoRuntime,
}

/// Result alias for startup operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Result alias for sink operations.
pub type SinkResult<T> = std::result::Result<T, SinkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::NotPositive("batch_size");
        assert_eq!(
            err.to_string(),
            "Configuration error: `batch_size` must be greater than zero"
        );
    }

    #[test]
    fn test_sink_setup_error_keeps_source() {
        let err = Error::SinkSetup {
            sink: "postgres".to_string(),
            source: SinkError::Unavailable("connection refused".to_string()),
        };
        assert!(err.to_string().contains("postgres"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
