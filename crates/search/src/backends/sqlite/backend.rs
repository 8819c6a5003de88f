//! SQLite backend.

use std::fmt::Debug;
use std::path::Path;
use std::time::Duration;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use serde::{Deserialize, Serialize};

use crate::error::{BackendError, StorageError, StorageResult, ValidationError};

use super::schema;

pub(crate) const BACKEND_NAME: &str = "sqlite";

/// SQLite store for inventory searches.
///
/// Holds an r2d2 pool. Every materialization checks out one connection and
/// runs the record query and the count query in one read transaction.
pub struct SqliteBackend {
    pool: Pool<SqliteConnectionManager>,
    location: String,
}

impl Debug for SqliteBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteBackend")
            .field("location", &self.location)
            .field("pool_size", &self.pool.max_size())
            .finish_non_exhaustive()
    }
}

/// Pool and pragma settings for [`SqliteBackend`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqliteBackendConfig {
    /// Upper bound on pooled connections for file databases.
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connections kept open while idle.
    #[serde(default = "default_min_idle")]
    pub min_idle: u32,

    /// How long a search waits for a free connection, in milliseconds.
    #[serde(default = "default_checkout_timeout_ms")]
    pub checkout_timeout_ms: u64,

    /// How long SQLite retries a locked database, in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u32,

    /// Switch file databases to write-ahead logging.
    #[serde(default = "default_on")]
    pub wal: bool,

    /// Enforce the `inventory_id` foreign keys.
    #[serde(default = "default_on")]
    pub foreign_keys: bool,
}

fn default_pool_size() -> u32 {
    8
}

fn default_min_idle() -> u32 {
    1
}

fn default_checkout_timeout_ms() -> u64 {
    10_000
}

fn default_busy_timeout_ms() -> u32 {
    5_000
}

fn default_on() -> bool {
    true
}

impl Default for SqliteBackendConfig {
    fn default() -> Self {
        Self {
            pool_size: default_pool_size(),
            min_idle: default_min_idle(),
            checkout_timeout_ms: default_checkout_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
            wal: default_on(),
            foreign_keys: default_on(),
        }
    }
}

impl SqliteBackendConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.pool_size == 0 {
            errors.push("Pool size cannot be 0".to_string());
        }

        if self.min_idle > self.pool_size {
            errors.push("Idle connections cannot exceed pool size".to_string());
        }

        if self.checkout_timeout_ms == 0 {
            errors.push("Checkout timeout cannot be 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

const MEMORY: &str = ":memory:";

impl SqliteBackend {
    /// Creates an empty in-memory store.
    pub fn in_memory() -> StorageResult<Self> {
        Self::with_config(MEMORY, SqliteBackendConfig::default())
    }

    /// Opens a database file, creating it if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StorageResult<Self> {
        Self::with_config(path, SqliteBackendConfig::default())
    }

    /// Opens a store with explicit pool and pragma settings.
    ///
    /// Every connection to `:memory:` opens its own empty database, so an
    /// in-memory store keeps exactly one connection alive for its lifetime.
    pub fn with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteBackendConfig,
    ) -> StorageResult<Self> {
        config.validate().map_err(|errors| ValidationError::InvalidParameters {
            message: errors.join("; "),
        })?;

        let location = path.as_ref().to_string_lossy().into_owned();
        let in_memory = location == MEMORY;

        let busy_timeout = Duration::from_millis(u64::from(config.busy_timeout_ms));
        let foreign_keys = config.foreign_keys;
        let manager = SqliteConnectionManager::file(path.as_ref()).with_init(move |conn| {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", foreign_keys)
        });

        let builder = Pool::builder()
            .connection_timeout(Duration::from_millis(config.checkout_timeout_ms));
        let builder = if in_memory {
            builder
                .max_size(1)
                .min_idle(Some(1))
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            builder
                .max_size(config.pool_size)
                .min_idle(Some(config.min_idle))
        };
        let pool = builder.build(manager).map_err(connection_failed)?;

        let backend = Self { pool, location };
        if config.wal && !in_memory {
            backend.enable_wal()?;
        }

        tracing::info!(location = %backend.location, in_memory, "opened sqlite store");
        Ok(backend)
    }

    /// Creates or upgrades the inventory schema.
    pub fn init_schema(&self) -> StorageResult<()> {
        let conn = self.connection()?;
        schema::initialize_schema(&conn)
    }

    /// Checks a connection out of the pool.
    ///
    /// Searches only read; this is exposed so callers can load data.
    pub fn connection(&self) -> StorageResult<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(connection_failed)
    }

    fn enable_wal(&self) -> StorageResult<()> {
        let conn = self.connection()?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(|e| internal(format!("Failed to enable WAL mode: {}", e)))?;
        tracing::debug!(journal_mode = %mode, "configured sqlite journal");
        Ok(())
    }

    /// Returns true for a `:memory:` store.
    pub fn is_memory(&self) -> bool {
        self.location == MEMORY
    }

    /// The database path, or `:memory:`.
    pub fn location(&self) -> &str {
        &self.location
    }
}

fn connection_failed(e: r2d2::Error) -> StorageError {
    StorageError::Backend(BackendError::ConnectionFailed {
        backend_name: BACKEND_NAME.to_string(),
        message: e.to_string(),
    })
}

fn internal(message: String) -> StorageError {
    StorageError::Backend(BackendError::Internal {
        backend_name: BACKEND_NAME.to_string(),
        message,
        source: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_validate() {
        let config = SqliteBackendConfig::default();
        assert_eq!(config.pool_size, 8);
        assert!(config.wal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialize_partial() {
        let config: SqliteBackendConfig =
            serde_json::from_str(r#"{"pool_size": 4, "wal": false}"#).unwrap();
        assert_eq!(config.pool_size, 4);
        assert!(!config.wal);
        assert_eq!(config.busy_timeout_ms, 5000);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = SqliteBackendConfig {
            pool_size: 0,
            ..Default::default()
        };
        assert_eq!(config.validate().unwrap_err().len(), 2);

        let err = SqliteBackend::with_config(MEMORY, config).unwrap_err();
        assert!(matches!(err, StorageError::Validation(_)));
    }

    #[test]
    fn test_in_memory_keeps_one_database() {
        let backend = SqliteBackend::in_memory().unwrap();
        assert!(backend.is_memory());
        backend.init_schema().unwrap();

        {
            let conn = backend.connection().unwrap();
            conn.execute(
                "INSERT INTO inventories (name, price, quantity, status, created_at, updated_at)
                 VALUES ('scratch', 1.0, 1, 0, '2024-01-01T00:00:00Z', '2024-01-01T00:00:00Z')",
                [],
            )
            .unwrap();
        }

        let conn = backend.connection().unwrap();
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM inventories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_open_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stockroom.db");
        let backend = SqliteBackend::open(&path).unwrap();
        assert!(!backend.is_memory());
        assert!(backend.location().ends_with("stockroom.db"));
        backend.init_schema().unwrap();
        assert!(path.exists());
    }
}
