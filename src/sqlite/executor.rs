use rusqlite::Connection;

use super::params::Params;
use super::query::build_result_set;
use crate::backend::{Backend, ExecuteError, PreparedHandle};
use crate::error::BackendError;
use crate::format::BoundValue;
use crate::results::ResultSet;
use crate::types::DatabaseType;

/// A single rusqlite connection.
///
/// Prepared handles are the SQL text; the statements themselves live in rusqlite's per-connection
/// cache, which [`Backend::reset_statements`] flushes.
pub struct SqliteBackend {
    conn: Option<Connection>,
}

impl SqliteBackend {
    #[must_use]
    pub fn new(conn: Connection) -> Self {
        Self { conn: Some(conn) }
    }

    fn conn(&self) -> Result<&Connection, BackendError> {
        self.conn
            .as_ref()
            .ok_or_else(|| BackendError::new("sqlite connection is closed"))
    }
}

impl Backend for SqliteBackend {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Sqlite
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, BackendError> {
        // compiles the statement now so syntax errors surface as prepare failures
        self.conn()?.prepare_cached(sql)?;
        Ok(PreparedHandle::sql(sql))
    }

    fn execute(
        &mut self,
        statement: &PreparedHandle,
        values: &[BoundValue],
    ) -> Result<ResultSet, ExecuteError> {
        let sql = statement.as_sql().ok_or_else(|| {
            ExecuteError::Execute(BackendError::new(
                "statement was not prepared by a sqlite connection",
            ))
        })?;
        let conn = self.conn()?;
        let mut stmt = conn.prepare_cached(sql)?;

        let expected = stmt.parameter_count();
        if expected != values.len() {
            return Err(ExecuteError::Bind(BackendError::new(format!(
                "statement expects {expected} parameters, {} supplied",
                values.len()
            ))));
        }
        let params = Params::convert(values);

        if stmt.column_count() > 0 {
            Ok(build_result_set(&mut stmt, params.as_values())?)
        } else {
            let changed = stmt.execute(rusqlite::params_from_iter(params.as_values().iter()))?;
            Ok(ResultSet::from_change_count(changed))
        }
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), BackendError> {
        Ok(self.conn()?.execute_batch(sql)?)
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.execute_batch("BEGIN")
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.execute_batch("COMMIT")
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.execute_batch("ROLLBACK")
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, BackendError> {
        let id = self.conn()?.last_insert_rowid();
        Ok((id != 0).then_some(id))
    }

    fn reset_statements(&mut self) {
        if let Some(conn) = &self.conn {
            conn.flush_prepared_statement_cache();
        }
    }

    fn close(&mut self) -> Result<(), BackendError> {
        match self.conn.take() {
            Some(conn) => conn.close().map_err(|(_, err)| err.into()),
            None => Ok(()),
        }
    }
}
