//! Role-based connection routing with lazily opened physical connections.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::Regex;
use tracing::{info, warn};

use crate::backend::{Backend, Connector};
use crate::config::{ConnectionConfig, EngineOptions};
use crate::config_store::ConfigStore;
use crate::error::SqlConduitError;
use crate::format::strip_leading_comments;
use crate::types::{ConnectionRole, DatabaseType};

static READ_STATEMENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(select|show|describe)\s").unwrap());

// process-wide so ids stay unique across routers and re-opened connections
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

struct Slot {
    id: u64,
    backend: Box<dyn Backend>,
}

/// A connection handed out by [`ConnectionRouter::get_connection`].
pub struct RoutedConnection<'a> {
    /// Role actually served, after read → write fallback.
    pub role: ConnectionRole,
    /// Identity of the physical connection; changes whenever the slot is re-opened or replaced.
    pub id: u64,
    pub backend: &'a mut dyn Backend,
}

/// Owns at most one write and one read connection and opens them on first use.
///
/// Read replicas rotate round-robin each time the read slot is (re)opened. A read request with
/// no read configuration is served by the write connection.
pub struct ConnectionRouter {
    db_type: DatabaseType,
    connector: Option<Box<dyn Connector>>,
    options: EngineOptions,
    write_config: Option<ConnectionConfig>,
    read_configs: Vec<ConnectionConfig>,
    next_read: usize,
    write: Option<Slot>,
    read: Option<Slot>,
    fallback_logged: bool,
}

impl ConnectionRouter {
    /// A router with no configuration; add it with the `with_*` builders.
    ///
    /// The bundled connector for `db_type` is installed when its cargo feature is enabled.
    #[must_use]
    pub fn new(db_type: DatabaseType, options: EngineOptions) -> Self {
        Self {
            db_type,
            connector: default_connector(db_type),
            options,
            write_config: None,
            read_configs: Vec::new(),
            next_read: 0,
            write: None,
            read: None,
            fallback_logged: false,
        }
    }

    /// Router reading its write config and read replicas from `store`, once.
    #[must_use]
    pub fn from_store(db_type: DatabaseType, store: &dyn ConfigStore, options: EngineOptions) -> Self {
        let mut router = Self::new(db_type, options);
        router.write_config = store.role_config(ConnectionRole::Write, None);
        router.read_configs = store
            .read_aliases()
            .iter()
            .filter_map(|alias| store.role_config(ConnectionRole::Read, Some(alias)))
            .collect();
        router
    }

    /// Router for a single `SQLite` database file (or `:memory:`).
    #[cfg(feature = "sqlite")]
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self::new(DatabaseType::Sqlite, EngineOptions::default())
            .with_write_config(ConnectionConfig::sqlite(path))
    }

    #[must_use]
    pub fn with_connector(mut self, connector: Box<dyn Connector>) -> Self {
        self.connector = Some(connector);
        self
    }

    #[must_use]
    pub fn with_write_config(mut self, config: ConnectionConfig) -> Self {
        self.write_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_read_config(mut self, config: ConnectionConfig) -> Self {
        self.read_configs.push(config);
        self
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    #[must_use]
    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Whether a read connection is configured or imported.
    #[must_use]
    pub fn has_read_target(&self) -> bool {
        self.read.is_some() || !self.read_configs.is_empty()
    }

    #[must_use]
    pub fn is_open(&self, role: ConnectionRole) -> bool {
        match role {
            ConnectionRole::Write => self.write.is_some(),
            ConnectionRole::Read => self.read.is_some(),
        }
    }

    /// `Read` for statements starting with `SELECT`, `SHOW` or `DESCRIBE` and whitespace;
    /// `Write` for everything else.
    #[must_use]
    pub fn classify(sql: &str) -> ConnectionRole {
        if READ_STATEMENT_RE.is_match(strip_leading_comments(sql)) {
            ConnectionRole::Read
        } else {
            ConnectionRole::Write
        }
    }

    /// The connection serving `role`, opening it on first use.
    ///
    /// # Errors
    /// `NoConnectionConfig` when the role has no parameters, `ConnectError` when opening fails
    /// (after the connect-failure hook has run), `ConfigError` when no connector is available.
    pub fn get_connection(
        &mut self,
        role: ConnectionRole,
    ) -> Result<RoutedConnection<'_>, SqlConduitError> {
        let role = self.resolve(role);
        if self.slot_mut(role).is_none() {
            let slot = self.open(role)?;
            *self.slot_mut(role) = Some(slot);
        }
        match self.slot_mut(role) {
            Some(slot) => Ok(RoutedConnection {
                role,
                id: slot.id,
                backend: slot.backend.as_mut(),
            }),
            None => Err(SqlConduitError::NoConnectionConfig(role)),
        }
    }

    /// Install an already-open connection for `role`, replacing (and closing) any current one.
    ///
    /// # Errors
    /// `ConfigError` when the backend speaks a different dialect than this router.
    pub fn import_connection(
        &mut self,
        role: ConnectionRole,
        backend: Box<dyn Backend>,
    ) -> Result<(), SqlConduitError> {
        if backend.database_type() != self.db_type {
            return Err(SqlConduitError::ConfigError(format!(
                "cannot import a {} connection into a {} router",
                backend.database_type(),
                self.db_type
            )));
        }
        let previous = self.slot_mut(role).replace(Slot {
            id: next_connection_id(),
            backend,
        });
        if let Some(previous) = previous {
            close_slot(role, previous);
        }
        info!(role = %role, "imported database connection");
        Ok(())
    }

    /// Ask every open connection to release statement resources.
    pub fn reset_statements(&mut self) {
        for slot in [self.write.as_mut(), self.read.as_mut()].into_iter().flatten() {
            slot.backend.reset_statements();
        }
    }

    /// Close every open connection. The next request re-opens lazily.
    pub fn close_all(&mut self) {
        if let Some(slot) = self.write.take() {
            close_slot(ConnectionRole::Write, slot);
        }
        if let Some(slot) = self.read.take() {
            close_slot(ConnectionRole::Read, slot);
        }
    }

    fn resolve(&mut self, role: ConnectionRole) -> ConnectionRole {
        if role == ConnectionRole::Read && !self.has_read_target() {
            if !self.fallback_logged {
                warn!("no read connection configured, serving reads from the write connection");
                self.fallback_logged = true;
            }
            return ConnectionRole::Write;
        }
        role
    }

    fn slot_mut(&mut self, role: ConnectionRole) -> &mut Option<Slot> {
        match role {
            ConnectionRole::Write => &mut self.write,
            ConnectionRole::Read => &mut self.read,
        }
    }

    fn next_config(&mut self, role: ConnectionRole) -> Option<ConnectionConfig> {
        match role {
            ConnectionRole::Write => self.write_config.clone(),
            ConnectionRole::Read => {
                if self.read_configs.is_empty() {
                    return None;
                }
                let config = self.read_configs[self.next_read % self.read_configs.len()].clone();
                self.next_read = self.next_read.wrapping_add(1);
                Some(config)
            }
        }
    }

    fn open(&mut self, role: ConnectionRole) -> Result<Slot, SqlConduitError> {
        let config = self
            .next_config(role)
            .ok_or(SqlConduitError::NoConnectionConfig(role))?;
        let connector = self.connector.as_ref().ok_or_else(|| {
            SqlConduitError::ConfigError(format!(
                "no connector available for {}; import a connection instead",
                self.db_type
            ))
        })?;

        match connector.connect(&config, &self.options) {
            Ok(backend) => {
                info!(role = %role, server = %config.describe(), "opened database connection");
                Ok(Slot {
                    id: next_connection_id(),
                    backend,
                })
            }
            Err(err) => {
                warn!(role = %role, server = %config.describe(), error = %err, "database connection failed");
                self.options
                    .notify_connect_failure(role, &config, &err.message);
                Err(SqlConduitError::ConnectError {
                    role,
                    message: err.message,
                })
            }
        }
    }
}

fn close_slot(role: ConnectionRole, mut slot: Slot) {
    match slot.backend.close() {
        Ok(()) => info!(role = %role, "closed database connection"),
        Err(err) => warn!(role = %role, error = %err, "error while closing database connection"),
    }
}

fn default_connector(db_type: DatabaseType) -> Option<Box<dyn Connector>> {
    match db_type {
        #[cfg(feature = "sqlite")]
        DatabaseType::Sqlite => Some(Box::new(crate::sqlite::SqliteConnector)),
        #[cfg(feature = "postgres")]
        DatabaseType::Postgres => Some(Box::new(crate::postgres::PostgresConnector)),
        _ => None,
    }
}

impl std::fmt::Debug for ConnectionRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRouter")
            .field("db_type", &self.db_type)
            .field("write_config", &self.write_config)
            .field("read_configs", &self.read_configs)
            .field("write_open", &self.write.is_some())
            .field("read_open", &self.read.is_some())
            .finish_non_exhaustive()
    }
}
