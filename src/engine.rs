//! The execution engine: routing, formatting, conversion, statement caching and transactions
//! for one logical session.
//!
//! ```rust,no_run
//! use sql_conduit::prelude::*;
//!
//! # fn main() -> Result<(), SqlConduitError> {
//! let mut db = Engine::new(ConnectionRouter::sqlite(":memory:"));
//! db.query(
//!     "CREATE TABLE users (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, status VARCHAR(20), group_id INT)",
//!     (),
//! )?;
//! db.query(
//!     "INSERT INTO users (status, group_id) VALUES (%s, %i)",
//!     [RowValues::from("active"), RowValues::Int(2)],
//! )?;
//! let mut rows = db.query("SELECT * FROM users WHERE status = %s", [RowValues::from("active")])?;
//! while let Some(row) = rows.fetch_assoc() {
//!     println!("{}", row["status"]);
//! }
//! # Ok(())
//! # }
//! ```

mod helpers;
mod schema;
mod sql_file;
mod statements;

use std::fmt;

use tracing::debug;

use crate::args::Args;
use crate::backend::{Backend, ExecuteError};
use crate::cursor::ResultCursor;
use crate::dialect;
use crate::error::SqlConduitError;
use crate::format::format_statement;
use crate::router::ConnectionRouter;
use crate::transaction::{TransactionState, TransactionStep};
use crate::types::{ConnectionRole, DatabaseType};

use schema::SchemaCache;
use statements::StatementCache;

/// One logical database session.
///
/// Not meant for concurrent use: the transaction depth and force-write flags are session state.
/// Independent engines share nothing.
pub struct Engine {
    router: ConnectionRouter,
    transaction: TransactionState,
    statements: StatementCache,
    schema: SchemaCache,
}

impl Engine {
    /// Engine over `router`. No connection is opened until the first statement needs one.
    #[must_use]
    pub fn new(router: ConnectionRouter) -> Self {
        Self {
            router,
            transaction: TransactionState::new(),
            statements: StatementCache::default(),
            schema: SchemaCache::default(),
        }
    }

    /// Engine over a single `SQLite` database file (or `:memory:`).
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(ConnectionRouter::sqlite(path))
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.router.database_type()
    }

    #[must_use]
    pub fn router(&self) -> &ConnectionRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut ConnectionRouter {
        &mut self.router
    }

    /// Unmatched `begin_transaction` calls.
    #[must_use]
    pub fn transaction_depth(&self) -> u32 {
        self.transaction.depth()
    }

    /// Number of prepared statements currently cached.
    #[must_use]
    pub fn cached_statements(&self) -> usize {
        self.statements.len()
    }

    /// Run one canonical SQL template.
    ///
    /// The statement is routed by its leading keyword (unless write is forced), converted to the
    /// backend dialect, formatted against `args`, prepared once per backend SQL shape, bound and
    /// executed.
    ///
    /// # Arguments
    ///
    /// * `template` - Canonical SQL with `%kind`, `{name}` or `{n}` placeholders
    /// * `args` - Positional values, or a single [`crate::FieldMap`] for `{name}` tokens
    ///
    /// # Returns
    ///
    /// A [`ResultCursor`] over the fetched rows, or carrying the affected-row count for
    /// statements without a result set.
    ///
    /// # Errors
    /// `InvalidArgument`/`MissingArgument` before anything is sent, `ConnectError` or
    /// `NoConnectionConfig` from routing, and `PrepareError`, `BindParamsError` or `QueryError`
    /// carrying the diagnostic SQL when the backend rejects the statement.
    pub fn query(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<ResultCursor, SqlConduitError> {
        let args = args.into();
        let role = self.transaction.route(ConnectionRouter::classify(template));
        let db_type = self.router.database_type();
        let conn = self.router.get_connection(role)?;

        let converted = dialect::convert(db_type, template);
        let formatted = format_statement(db_type, &converted.statement, &args)?;

        for sql in &converted.preamble {
            debug!(sql = %sql, "running dialect preamble");
            conn.backend
                .execute_batch(sql)
                .map_err(|err| SqlConduitError::QueryError {
                    sql: sql.clone(),
                    message: err.message,
                })?;
        }

        let key = StatementCache::key(&formatted.sql);
        let handle = if let Some(handle) = self.statements.get(&key, conn.id) {
            debug!(key = %key, "prepared statement cache hit");
            handle
        } else {
            debug!(key = %key, sql = %formatted.sql, "preparing statement");
            let handle = conn.backend.prepare(&formatted.sql).map_err(|err| {
                SqlConduitError::PrepareError {
                    sql: formatted.diagnostic.clone(),
                    message: err.message,
                }
            })?;
            self.statements.insert(key, conn.id, handle.clone());
            handle
        };

        debug!(role = %conn.role, sql = %formatted.diagnostic, "executing statement");
        let result = conn
            .backend
            .execute(&handle, &formatted.values)
            .map_err(|err| match err {
                ExecuteError::Bind(err) => SqlConduitError::BindParamsError {
                    sql: formatted.diagnostic.clone(),
                    message: err.message,
                },
                ExecuteError::Execute(err) => SqlConduitError::QueryError {
                    sql: formatted.diagnostic.clone(),
                    message: err.message,
                },
            })?;

        self.schema.invalidate_for(template);
        Ok(ResultCursor::new(result))
    }

    /// Run a statement and return its affected-row count.
    ///
    /// # Errors
    /// Same as [`Engine::query`].
    pub fn execute(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<usize, SqlConduitError> {
        Ok(self.query(template, args)?.rows_affected())
    }

    /// Open a transaction on the write connection, or nest inside the open one.
    ///
    /// # Arguments
    ///
    /// * `force_write` - Send every statement until the outermost commit/rollback to the write
    ///   connection, reads included. Ignored when nesting.
    ///
    /// # Errors
    /// `BeginTransactionError` when the backend refuses; the depth is left unchanged.
    pub fn begin_transaction(&mut self, force_write: bool) -> Result<(), SqlConduitError> {
        if self.transaction.begin() == TransactionStep::Nested {
            return Ok(());
        }
        let conn = self.router.get_connection(ConnectionRole::Write)?;
        conn.backend
            .begin()
            .map_err(|err| SqlConduitError::BeginTransactionError(err.message))?;
        self.transaction.opened(force_write);
        Ok(())
    }

    /// # Errors
    /// `CommitError` when the outermost commit fails; the depth is left unchanged.
    pub fn commit(&mut self) -> Result<(), SqlConduitError> {
        if self.transaction.end() != TransactionStep::Physical {
            return Ok(());
        }
        let conn = self.router.get_connection(ConnectionRole::Write)?;
        conn.backend
            .commit()
            .map_err(|err| SqlConduitError::CommitError(err.message))?;
        self.transaction.closed();
        Ok(())
    }

    /// # Errors
    /// `RollbackError` when the outermost rollback fails; the depth is left unchanged.
    pub fn rollback(&mut self) -> Result<(), SqlConduitError> {
        if self.transaction.end() != TransactionStep::Physical {
            return Ok(());
        }
        let conn = self.router.get_connection(ConnectionRole::Write)?;
        conn.backend
            .rollback()
            .map_err(|err| SqlConduitError::RollbackError(err.message))?;
        self.transaction.closed();
        Ok(())
    }

    /// Send the next statement (or all statements, with `always`) to the write connection.
    pub fn force_write(&mut self, always: bool) {
        self.transaction.force_write(always);
    }

    /// Id generated by the last insert on the write connection.
    ///
    /// # Errors
    /// Routing errors, or `QueryError` when the backend lookup fails.
    pub fn insert_id(&mut self) -> Result<Option<i64>, SqlConduitError> {
        let conn = self.router.get_connection(ConnectionRole::Write)?;
        conn.backend
            .last_insert_id()
            .map_err(|err| SqlConduitError::QueryError {
                sql: "last insert id".to_string(),
                message: err.message,
            })
    }

    /// Forget cached table, column and primary-key lookups.
    pub fn clear_cache(&mut self) {
        self.schema.clear();
    }

    /// Drop every prepared statement; later calls re-prepare.
    pub fn clear_statement_cache(&mut self) {
        self.statements.clear();
    }

    /// Release statement resources held by open connections, e.g. before DDL.
    pub fn close_cursors(&mut self) {
        self.router.reset_statements();
    }

    /// Close every connection and reset session state. The next call reconnects.
    pub fn close_all(&mut self) {
        self.statements.clear();
        self.transaction.reset();
        self.router.close_all();
    }

    /// Hand an externally opened connection to the router for `role`.
    ///
    /// # Errors
    /// `ConfigError` when the backend's dialect does not match the engine's.
    pub fn import_connection(
        &mut self,
        role: ConnectionRole,
        backend: Box<dyn Backend>,
    ) -> Result<(), SqlConduitError> {
        self.router.import_connection(role, backend)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("router", &self.router)
            .field("transaction", &self.transaction)
            .field("cached_statements", &self.statements.len())
            .finish_non_exhaustive()
    }
}
