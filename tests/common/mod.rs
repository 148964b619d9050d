//! A scripted in-memory backend that records every physical call.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Once};

use sql_conduit::prelude::*;
use sql_conduit::{BackendError, BoundValue, ExecuteError, PreparedHandle, RawConnectionConfig};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness; filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Default)]
pub struct Journal {
    events: Mutex<Vec<String>>,
    pub fail_next_commit: AtomicBool,
    pub fail_next_begin: AtomicBool,
}

impl Journal {
    pub fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

pub struct ScriptedBackend {
    pub name: String,
    pub journal: Arc<Journal>,
}

impl Backend for ScriptedBackend {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn prepare(&mut self, sql: &str) -> Result<PreparedHandle, BackendError> {
        self.journal.record(format!("prepare {}: {sql}", self.name));
        if sql.contains("syntax error") {
            return Err(BackendError::new("You have an error in your SQL syntax"));
        }
        Ok(PreparedHandle::sql(sql))
    }

    fn execute(
        &mut self,
        statement: &PreparedHandle,
        values: &[BoundValue],
    ) -> Result<ResultSet, ExecuteError> {
        let sql = statement.as_sql().unwrap_or_default();
        self.journal
            .record(format!("execute {}: {sql} [{}]", self.name, values.len()));
        if sql.to_ascii_uppercase().starts_with("SELECT") {
            let mut rs = ResultSet::with_capacity(1);
            rs.set_column_names(Arc::new(vec!["served_by".to_string()]));
            rs.add_row_values(vec![RowValues::Text(self.name.clone())]);
            Ok(rs)
        } else {
            Ok(ResultSet::from_change_count(1))
        }
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), BackendError> {
        self.journal.record(format!("batch {}: {sql}", self.name));
        Ok(())
    }

    fn begin(&mut self) -> Result<(), BackendError> {
        if self.journal.fail_next_begin.swap(false, Ordering::SeqCst) {
            return Err(BackendError::new("cannot begin"));
        }
        self.journal.record(format!("begin {}", self.name));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), BackendError> {
        if self.journal.fail_next_commit.swap(false, Ordering::SeqCst) {
            return Err(BackendError::new("deadlock detected"));
        }
        self.journal.record(format!("commit {}", self.name));
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), BackendError> {
        self.journal.record(format!("rollback {}", self.name));
        Ok(())
    }

    fn last_insert_id(&mut self) -> Result<Option<i64>, BackendError> {
        Ok(Some(42))
    }

    fn close(&mut self) -> Result<(), BackendError> {
        self.journal.record(format!("close {}", self.name));
        Ok(())
    }
}

/// Opens a [`ScriptedBackend`] named after the config's dbname; `down` always fails.
pub struct ScriptedConnector {
    pub journal: Arc<Journal>,
}

impl Connector for ScriptedConnector {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::MySql
    }

    fn connect(
        &self,
        config: &ConnectionConfig,
        _options: &EngineOptions,
    ) -> Result<Box<dyn Backend>, BackendError> {
        self.journal.record(format!("connect {}", config.dbname));
        if config.dbname == "down" {
            return Err(BackendError::new("Connection refused"));
        }
        Ok(Box::new(ScriptedBackend {
            name: config.dbname.clone(),
            journal: Arc::clone(&self.journal),
        }))
    }
}

pub fn mysql_config(dbname: &str) -> ConnectionConfig {
    ConnectionConfig::validate(
        RawConnectionConfig {
            dbname: Some(dbname.to_string()),
            user: Some("app".to_string()),
            ..Default::default()
        },
        DatabaseType::MySql,
    )
    .unwrap()
}

/// A router over the scripted connector with a `primary` write database and the given replicas.
pub fn scripted_router(journal: &Arc<Journal>, replicas: &[&str]) -> ConnectionRouter {
    scripted_router_with(journal, "primary", replicas, EngineOptions::default())
}

pub fn scripted_router_with(
    journal: &Arc<Journal>,
    write: &str,
    replicas: &[&str],
    options: EngineOptions,
) -> ConnectionRouter {
    init_tracing();
    let mut router = ConnectionRouter::new(DatabaseType::MySql, options)
        .with_connector(Box::new(ScriptedConnector {
            journal: Arc::clone(journal),
        }))
        .with_write_config(mysql_config(write));
    for replica in replicas {
        router = router.with_read_config(mysql_config(replica));
    }
    router
}
