use std::future::Future;

use tokio::task::JoinHandle;
use tokio_postgres::Client;
use tokio_postgres::error::SqlState;
use tokio_postgres::types::ToSql;

use super::params::PgParam;
use super::query::build_result_set;
use super::runtime::{PrivateRuntime, run_blocking};
use crate::backend::{Backend, ExecuteError, PreparedHandle};
use crate::error::BackendError;
use crate::format::BoundValue;
use crate::results::ResultSet;
use crate::types::DatabaseType;

const LASTVAL_SAVEPOINT: &str = "sql_conduit_lastval";

/// A tokio-postgres client driven synchronously on a private runtime.
pub struct PostgresBackend {
    // dropped before the runtime so the connection task sees the client go away
    client: Option<Client>,
    connection_task: Option<JoinHandle<()>>,
    in_transaction: bool,
    runtime: PrivateRuntime,
}

impl PostgresBackend {
    pub(crate) fn new(runtime: PrivateRuntime, client: Client, connection_task: JoinHandle<()>) -> Self {
        Self {
            client: Some(client),
            connection_task: Some(connection_task),
            in_transaction: false,
            runtime,
        }
    }

    fn client(&self) -> Result<&Client, BackendError> {
        self.client
            .as_ref()
            .ok_or_else(|| BackendError::new("postgres connection is closed"))
    }

    fn run<F>(&self, future: F) -> Result<F::Output, BackendError>
    where
        F: Future + Send,
        F::Output: Send,
    {
        run_blocking(&self.runtime, future)
    }

    fn bind(
        statement: &tokio_postgres::Statement,
        values: &[BoundValue],
    ) -> Result<Vec<PgParam>, ExecuteError> {
        let types = statement.params();
        if types.len() != values.len() {
            return Err(ExecuteError::Bind(BackendError::new(format!(
                "statement expects {} parameters, {} supplied",
                types.len(),
                values.len()
            ))));
        }
        values
            .iter()
            .zip(types)
            .map(|(value, ty)| PgParam::convert(value, ty))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|message| ExecuteError::Bind(BackendError::new(message)))
    }
}

impl Backend for PostgresBackend {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, BackendError> {
        let client = self.client()?;
        let statement = self.run(client.prepare(sql))??;
        Ok(PreparedHandle::Postgres(statement))
    }

    fn execute(
        &mut self,
        statement: &PreparedHandle,
        values: &[BoundValue],
    ) -> Result<ResultSet, ExecuteError> {
        let PreparedHandle::Postgres(statement) = statement else {
            return Err(ExecuteError::Execute(BackendError::new(
                "statement was not prepared by a postgres connection",
            )));
        };

        let params = Self::bind(statement, values)?;
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p as &(dyn ToSql + Sync))
            .collect();
        let client = self.client()?;

        if statement.columns().is_empty() {
            let changed = self.run(client.execute(statement, &refs))??;
            Ok(ResultSet::from_change_count(
                usize::try_from(changed).unwrap_or(usize::MAX),
            ))
        } else {
            let rows = self.run(client.query(statement, &refs))??;
            let column_names = statement
                .columns()
                .iter()
                .map(|col| col.name().to_string())
                .collect();
            Ok(build_result_set(column_names, &rows)?)
        }
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), BackendError> {
        let client = self.client()?;
        Ok(self.run(client.batch_execute(sql))??)
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        self.execute_batch("BEGIN")?;
        self.in_transaction = true;
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        self.execute_batch("COMMIT")?;
        self.in_transaction = false;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.execute_batch("ROLLBACK")?;
        self.in_transaction = false;
        Ok(())
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, BackendError> {
        // a failed lastval() would abort an open transaction
        let guarded = self.in_transaction;
        if guarded {
            self.execute_batch(&format!("SAVEPOINT {LASTVAL_SAVEPOINT}"))?;
        }

        let client = self.client()?;
        let outcome = self.run(client.query_one("SELECT lastval()", &[]))?;

        match outcome {
            Ok(row) => {
                if guarded {
                    self.execute_batch(&format!("RELEASE SAVEPOINT {LASTVAL_SAVEPOINT}"))?;
                }
                Ok(Some(row.try_get::<_, i64>(0)?))
            }
            Err(err) => {
                if guarded {
                    self.execute_batch(&format!("ROLLBACK TO SAVEPOINT {LASTVAL_SAVEPOINT}"))?;
                }
                // 55000: lastval is not yet defined in this session
                if err.code() == Some(&SqlState::OBJECT_NOT_IN_PREREQUISITE_STATE) {
                    Ok(None)
                } else {
                    Err(err.into())
                }
            }
        }
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.in_transaction = false;
        drop(self.client.take());
        if let Some(task) = self.connection_task.take() {
            // the task ends once the client is gone; a join error only means it was cancelled
            let _ = run_blocking(&self.runtime, task)?;
        }
        Ok(())
    }
}
