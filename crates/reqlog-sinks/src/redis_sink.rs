//! Redis list destination.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use reqlog_core::{ConfigError, Record, Sink, SinkError, SinkResult};
use tokio::sync::OnceCell;

/// Sink pushing each record as JSON onto a Redis list (`RPUSH`).
///
/// The connection is opened by [`Sink::initialize`], so an unreachable server
/// fails pipeline startup instead of the first delivery. The multiplexed
/// connection is reused for every record.
pub struct RedisSink {
    client: Client,
    key: String,
    max_len: Option<usize>,
    conn: OnceCell<MultiplexedConnection>,
}

impl RedisSink {
    /// Create a sink for list `key` on the server at `url`.
    ///
    /// Does not connect.
    pub fn new(url: &str, key: &str) -> SinkResult<Self> {
        if url.trim().is_empty() {
            return Err(ConfigError::Missing("redis url".to_string()).into());
        }
        if key.trim().is_empty() {
            return Err(ConfigError::Missing("redis list key".to_string()).into());
        }
        let client = Client::open(url).map_err(|e| ConfigError::Invalid {
            name: "redis url".to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            key: key.to_string(),
            max_len: None,
            conn: OnceCell::new(),
        })
    }

    /// Keep only the newest `max_len` entries (`LTRIM` after each push).
    pub fn max_len(mut self, max_len: usize) -> Self {
        self.max_len = Some(max_len.max(1));
        self
    }

    /// The list key.
    pub fn key(&self) -> &str {
        &self.key
    }

    async fn connection(&self) -> SinkResult<MultiplexedConnection> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                self.client
                    .get_multiplexed_tokio_connection()
                    .await
                    .map_err(|e| SinkError::Unavailable(e.to_string()))
            })
            .await?;
        Ok(conn.clone())
    }
}

impl std::fmt::Debug for RedisSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisSink")
            .field("key", &self.key)
            .field("max_len", &self.max_len)
            .field("connected", &self.conn.initialized())
            .finish()
    }
}

#[async_trait]
impl Sink for RedisSink {
    fn name(&self) -> &str {
        "redis"
    }

    async fn initialize(&self) -> SinkResult<()> {
        self.connection().await?;
        tracing::debug!(key = %self.key, "redis sink connected");
        Ok(())
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        let payload = record.to_json_line()?;
        let mut conn = self.connection().await?;

        conn.rpush::<_, _, ()>(&self.key, payload)
            .await
            .map_err(|e| SinkError::Backend(e.to_string()))?;

        if let Some(max_len) = self.max_len {
            conn.ltrim::<_, ()>(&self.key, -(max_len as isize), -1)
                .await
                .map_err(|e| SinkError::Backend(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_missing_parameters() {
        assert!(matches!(
            RedisSink::new("", "requests"),
            Err(SinkError::Config(ConfigError::Missing(_)))
        ));
        assert!(matches!(
            RedisSink::new("redis://127.0.0.1/", " "),
            Err(SinkError::Config(ConfigError::Missing(_)))
        ));
    }

    #[test]
    fn test_rejects_malformed_url() {
        assert!(matches!(
            RedisSink::new("not a url", "requests"),
            Err(SinkError::Config(ConfigError::Invalid { .. }))
        ));
    }

    #[test]
    fn test_construction_does_not_connect() {
        let sink = RedisSink::new("redis://127.0.0.1:1/", "requests")
            .unwrap()
            .max_len(0);
        assert_eq!(sink.key(), "requests");
        assert_eq!(sink.max_len, Some(1));
        assert!(!sink.conn.initialized());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_setup() {
        let sink = RedisSink::new("redis://127.0.0.1:1/", "requests").unwrap();
        assert!(matches!(
            sink.initialize().await,
            Err(SinkError::Unavailable(_))
        ));
    }
}
