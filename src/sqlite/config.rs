use rusqlite::Connection;
use tracing::debug;

use super::executor::SqliteBackend;
use crate::backend::{Backend, Connector};
use crate::config::{ConnectionConfig, EngineOptions};
use crate::error::BackendError;
use crate::types::DatabaseType;

/// Prepared statements kept per connection by rusqlite's statement cache.
const STATEMENT_CACHE_CAPACITY: usize = 128;

/// Opens `SQLite` connections; `dbname` is the file path or `:memory:`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteConnector;

impl SqliteConnector {
    /// Open a connection without going through the router.
    ///
    /// # Errors
    /// The rusqlite message when the file cannot be opened or the session setup fails.
    pub fn open(config: &ConnectionConfig) -> Result<SqliteBackend, BackendError> {
        let conn = Connection::open(&config.dbname)?;
        conn.set_prepared_statement_cache_capacity(STATEMENT_CACHE_CAPACITY);
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        debug!(path = %config.dbname, "opened sqlite connection");
        Ok(SqliteBackend::new(conn))
    }
}

impl Connector for SqliteConnector {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn connect(
        &self,
        config: &ConnectionConfig,
        _options: &EngineOptions,
    ) -> Result<Box<dyn Backend>, BackendError> {
        Ok(Box::new(Self::open(config)?))
    }
}
