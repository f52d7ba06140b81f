//! PostgreSQL table destination.

use async_trait::async_trait;
use reqlog_core::{ConfigError, Record, Sink, SinkError, SinkResult};
use sqlx::{PgPool, Pool, Postgres};

/// Default table name.
pub const DEFAULT_TABLE: &str = "reqlog_records";

/// Sink inserting one row per record.
///
/// When `auto_create_table` is on (the default), [`Sink::initialize`] creates
/// the table if it does not exist:
///
/// ```sql
/// CREATE TABLE IF NOT EXISTS reqlog_records (
///     id UUID PRIMARY KEY,
///     level TEXT NOT NULL,
///     method TEXT NOT NULL,
///     path TEXT NOT NULL,
///     status_code INT NOT NULL,
///     duration_ms DOUBLE PRECISION NOT NULL,
///     correlation_id TEXT NOT NULL,
///     message TEXT,
///     payload JSONB NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL
/// );
/// ```
#[derive(Debug, Clone)]
pub struct PostgresSink {
    pool: Pool<Postgres>,
    table_name: String,
    auto_create_table: bool,
}

impl PostgresSink {
    /// Create a sink writing to `table_name` through `pool`.
    ///
    /// The table name is interpolated into SQL, so it must be a plain
    /// identifier, optionally schema-qualified (`logs.requests`).
    pub fn new(pool: Pool<Postgres>, table_name: &str) -> SinkResult<Self> {
        validate_table_name(table_name)?;
        Ok(Self {
            pool,
            table_name: table_name.to_string(),
            auto_create_table: true,
        })
    }

    /// Create a sink with a lazily connecting pool. No connection is made
    /// until setup or the first delivery.
    pub fn connect_lazy(url: &str, table_name: &str) -> SinkResult<Self> {
        if url.trim().is_empty() {
            return Err(ConfigError::Missing("postgres connection url".to_string()).into());
        }
        let pool = PgPool::connect_lazy(url).map_err(|e| ConfigError::Invalid {
            name: "postgres connection url".to_string(),
            reason: e.to_string(),
        })?;
        Self::new(pool, table_name)
    }

    /// Create the table during setup. Default: true.
    pub fn auto_create_table(mut self, enabled: bool) -> Self {
        self.auto_create_table = enabled;
        self
    }

    /// The target table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Create the table if it does not exist.
    pub async fn ensure_schema(&self) -> SinkResult<()> {
        let query = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                level TEXT NOT NULL,
                method TEXT NOT NULL,
                path TEXT NOT NULL,
                status_code INT NOT NULL,
                duration_ms DOUBLE PRECISION NOT NULL,
                correlation_id TEXT NOT NULL,
                message TEXT,
                payload JSONB NOT NULL,
                created_at TIMESTAMPTZ NOT NULL
            )
            "#,
            table = self.table_name
        );

        sqlx::query(&query)
            .execute(&self.pool)
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Sink for PostgresSink {
    fn name(&self) -> &str {
        "postgres"
    }

    async fn initialize(&self) -> SinkResult<()> {
        if self.auto_create_table {
            self.ensure_schema().await?;
            tracing::debug!(table = %self.table_name, "postgres sink schema ensured");
        }
        Ok(())
    }

    async fn deliver(&self, record: &Record) -> SinkResult<()> {
        let query = format!(
            r#"
            INSERT INTO {} (id, level, method, path, status_code, duration_ms, correlation_id, message, payload, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
            self.table_name
        );

        let payload = serde_json::to_value(record)?;
        let message = record.exception.as_ref().and_then(|e| e.message.clone());

        sqlx::query(&query)
            .bind(uuid::Uuid::new_v4())
            .bind(record.severity.as_str())
            .bind(&record.method)
            .bind(&record.path)
            .bind(i32::from(record.status))
            .bind(record.duration_ms)
            .bind(&record.correlation_id)
            .bind(message)
            .bind(payload)
            .bind(record.timestamp)
            .execute(&self.pool)
            .await
            .map_err(|e| SinkError::Backend(e.to_string()))?;

        Ok(())
    }
}

/// Accept `name` or `schema.name`, each part a plain SQL identifier of at
/// most 63 bytes.
fn validate_table_name(table_name: &str) -> Result<(), ConfigError> {
    let invalid = |reason: &str| ConfigError::Invalid {
        name: "table_name".to_string(),
        reason: format!("{reason}: {table_name:?}"),
    };

    let parts: Vec<&str> = table_name.split('.').collect();
    if parts.len() > 2 {
        return Err(invalid("too many qualifiers"));
    }
    for part in parts {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
            _ => return Err(invalid("must start with a letter or underscore")),
        }
        if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid("only letters, digits and underscores are allowed"));
        }
        if part.len() > 63 {
            return Err(invalid("identifier longer than 63 bytes"));
        }
    }
    Ok(())
}
