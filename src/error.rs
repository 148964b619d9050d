use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

use crate::types::ConnectionRole;
use crate::validation::PlaceholderKind;

/// Every failure surfaced by the execution layer.
///
/// Statement-level variants carry the diagnostic SQL (literal values substituted), never the raw
/// template, together with the message reported by the backend driver.
#[derive(Debug, Error)]
pub enum SqlConduitError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Unable to connect to {role} database: {message}")]
    ConnectError {
        role: ConnectionRole,
        message: String,
    },

    #[error("No connection parameters configured for the {0} role")]
    NoConnectionConfig(ConnectionRole),

    #[error(
        "Invalid SQL argument, expecting a {} and received '{value}' instead within SQL statement, {sql}",
        kind.description()
    )]
    InvalidArgument {
        kind: PlaceholderKind,
        value: String,
        sql: String,
    },

    #[error("Missing SQL argument for placeholder {token} within SQL statement, {sql}")]
    MissingArgument { token: String, sql: String },

    #[error("Unable to prepare SQL statement, {sql} with error: {message}")]
    PrepareError { sql: String, message: String },

    #[error("Unable to execute SQL statement, {sql}\n\nError: {message}")]
    QueryError { sql: String, message: String },

    #[error("Unable to bind parameters for SQL statement, {sql}: {message}")]
    BindParamsError { sql: String, message: String },

    #[error("Unable to begin database transaction, error: {0}")]
    BeginTransactionError(String),

    #[error("Unable to commit database transaction, error: {0}")]
    CommitError(String),

    #[error("Unable to rollback database transaction, error: {0}")]
    RollbackError(String),

    #[error("Database table does not exist, {0}")]
    TableNotExists(String),

    #[error("The column '{column}' does not exist in the table '{table}'")]
    ColumnNotExists { table: String, column: String },

    #[error("{0}")]
    ObjectNotExists(String),

    #[error("Unable to perform insert on '{0}', as no values to insert were specified")]
    NoInsertData(String),

    #[error("Unable to read SQL file {path}: {message}")]
    SqlFileError { path: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection manager error: {0}")]
    ConnectionManagerError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),
}

impl SqlConduitError {
    /// Diagnostic SQL attached to the error, when the failure concerned a single statement.
    #[must_use]
    pub fn statement(&self) -> Option<&str> {
        match self {
            Self::InvalidArgument { sql, .. }
            | Self::MissingArgument { sql, .. }
            | Self::PrepareError { sql, .. }
            | Self::QueryError { sql, .. }
            | Self::BindParamsError { sql, .. } => Some(sql),
            _ => None,
        }
    }
}

/// Error reported by a physical backend before the engine classifies it.
///
/// Drivers only know that *something* failed; the engine decides whether that is a prepare,
/// bind, execute, or transaction-control failure and wraps it accordingly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
    /// Driver specific code (SQLSTATE for Postgres, extended result code for `SQLite`).
    pub code: Option<String>,
}

impl BackendError {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for BackendError {
    fn from(err: rusqlite::Error) -> Self {
        let code = err
            .sqlite_error()
            .map(|e| e.extended_code.to_string());
        BackendError {
            message: err.to_string(),
            code,
        }
    }
}

#[cfg(feature = "postgres")]
impl From<tokio_postgres::Error> for BackendError {
    fn from(err: tokio_postgres::Error) -> Self {
        let code = err.code().map(|c| c.code().to_string());
        let message = match err.as_db_error() {
            Some(db) => db.message().to_string(),
            None => err.to_string(),
        };
        BackendError { message, code }
    }
}
