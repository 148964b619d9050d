//! The seam between the engine and physical drivers.
//!
//! A [`Connector`] opens [`Backend`]s from validated configuration; the router owns the
//! resulting boxes. Callers with a driver this crate does not ship (e.g. `MySQL`) implement both
//! traits, or hand an open backend to [`crate::ConnectionRouter::import_connection`].

use std::fmt;
use std::sync::Arc;

use crate::config::{ConnectionConfig, EngineOptions};
use crate::error::BackendError;
use crate::format::BoundValue;
use crate::results::ResultSet;
use crate::types::DatabaseType;

/// Backend-native prepared statement.
#[derive(Clone)]
pub enum PreparedHandle {
    /// Drivers that cache statements by SQL text (`SQLite`, test doubles) keep only the text.
    Sql(Arc<str>),
    #[cfg(feature = "postgres")]
    Postgres(tokio_postgres::Statement),
}

impl PreparedHandle {
    #[must_use]
    pub fn sql(sql: &str) -> Self {
        PreparedHandle::Sql(Arc::from(sql))
    }

    #[must_use]
    pub fn as_sql(&self) -> Option<&str> {
        match self {
            PreparedHandle::Sql(sql) => Some(sql),
            #[cfg(feature = "postgres")]
            PreparedHandle::Postgres(_) => None,
        }
    }
}

impl fmt::Debug for PreparedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreparedHandle::Sql(sql) => f.debug_tuple("Sql").field(sql).finish(),
            #[cfg(feature = "postgres")]
            PreparedHandle::Postgres(statement) => f
                .debug_struct("Postgres")
                .field("params", &statement.params().len())
                .field("columns", &statement.columns().len())
                .finish(),
        }
    }
}

/// Failure while running a prepared statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    /// A value could not be converted to the parameter type the backend expects.
    Bind(BackendError),
    Execute(BackendError),
}

impl From<BackendError> for ExecuteError {
    fn from(err: BackendError) -> Self {
        ExecuteError::Execute(err)
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for ExecuteError {
    fn from(err: rusqlite::Error) -> Self {
        ExecuteError::Execute(err.into())
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for ExecuteError {
    fn from(err: tokio_postgres::Error) -> Self {
        ExecuteError::Execute(err.into())
    }
}

/// One open physical connection.
///
/// Implementations are driven from a single thread at a time (`&mut self` everywhere).
pub trait Backend: Send {
    fn database_type(&self) -> DatabaseType;

    /// Prepare `sql`, which already uses this backend's parameter markers.
    ///
    /// # Errors
    /// The driver's message when the statement is rejected.
    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, BackendError>;

    /// Bind `values` and run `statement`.
    ///
    /// The returned set carries column metadata when the statement produced any; otherwise its
    /// `rows_affected` is the driver's change count.
    ///
    /// # Errors
    /// [`ExecuteError::Bind`] when a value does not fit its parameter, [`ExecuteError::Execute`]
    /// for anything the server rejects.
    fn execute(
        &mut self,
        statement: &PreparedHandle,
        values: &[BoundValue],
    ) -> Result<ResultSet, ExecuteError>;

    /// Run one or more parameterless statements.
    ///
    /// # Errors
    /// The driver's message for the first failing statement.
    fn execute_batch(&mut self, sql: &str) -> Result<(), BackendError>;

    /// # Errors
    /// The driver's message when the transaction cannot be opened.
    fn begin(&mut self) -> Result<(), BackendError>;

    /// # Errors
    /// The driver's message when the commit fails.
    fn commit(&mut self) -> Result<(), BackendError>;

    /// # Errors
    /// The driver's message when the rollback fails.
    fn rollback(&mut self) -> Result<(), BackendError>;

    /// Id generated by the most recent insert on this connection, if any.
    ///
    /// # Errors
    /// The driver's message when the lookup itself fails.
    fn last_insert_id(&mut self) -> Result<Option<i64>, BackendError>;

    /// Release statement resources held by the driver (open cursors, statement caches).
    fn reset_statements(&mut self) {}

    /// Close the connection. The backend is dropped afterwards either way.
    ///
    /// # Errors
    /// The driver's message when closing reports a failure.
    fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }
}

/// Opens physical connections for one backend flavour.
pub trait Connector: Send + Sync {
    fn database_type(&self) -> DatabaseType;

    /// Open and initialise a session for `config`.
    ///
    /// # Errors
    /// The driver's message when the connection or its session setup fails.
    fn connect(
        &self,
        config: &ConnectionConfig,
        options: &EngineOptions,
    ) -> Result<Box<dyn Backend>, BackendError>;
}
