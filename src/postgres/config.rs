use tokio_postgres::NoTls;
use tracing::{debug, warn};

use super::executor::PostgresBackend;
use super::runtime::{build_runtime, run_blocking};
use crate::backend::{Backend, Connector};
use crate::config::{ConnectionConfig, EngineOptions};
use crate::error::BackendError;
use crate::types::DatabaseType;

/// Opens tokio-postgres connections, each driven by its own current-thread runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostgresConnector;

impl PostgresConnector {
    /// Connect and apply session settings.
    ///
    /// # Errors
    /// Returns the driver error when the server cannot be reached, rejects the credentials, or
    /// refuses a session setting.
    pub fn open(
        config: &ConnectionConfig,
        options: &EngineOptions,
    ) -> Result<PostgresBackend, BackendError> {
        let runtime = build_runtime()?;

        let mut pg_config = tokio_postgres::Config::new();
        pg_config
            .dbname(&config.dbname)
            .user(&config.user)
            .host(&config.host)
            .port(config.port);
        if !config.password.is_empty() {
            pg_config.password(&config.password);
        }

        let (client, connection) = run_blocking(&runtime, pg_config.connect(NoTls))??;
        let connection_task = runtime.spawn(async move {
            if let Err(err) = connection.await {
                warn!(error = %err, "postgres connection closed with error");
            }
        })?;

        let mut backend = PostgresBackend::new(runtime, client, connection_task);
        backend.execute_batch(&session_setup(options))?;

        debug!(server = %config.describe(), "opened postgres connection");
        Ok(backend)
    }
}

impl Connector for PostgresConnector {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::Postgres
    }

    fn connect(
        &self,
        config: &ConnectionConfig,
        options: &EngineOptions,
    ) -> Result<Box<dyn Backend>, BackendError> {
        Ok(Box::new(Self::open(config, options)?))
    }
}

fn quote(value: &str) -> String {
    value.replace('\'', "''")
}

fn session_setup(options: &EngineOptions) -> String {
    format!(
        "SET client_min_messages = 'error'; SET TIMEZONE TO '{}'; SET CLIENT_ENCODING TO '{}'",
        quote(&options.timezone_offset),
        quote(&options.charset)
    )
}
