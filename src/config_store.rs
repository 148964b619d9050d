//! External storage of connection parameters, consulted once when a router is built.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{ConnectionConfig, RawConnectionConfig};
use crate::error::SqlConduitError;
use crate::types::{ConnectionRole, DatabaseType};

/// Read side of a connection-parameter store.
pub trait ConfigStore: Send + Sync {
    /// Parameters for the write target (`alias` ignored) or the read replica named `alias`.
    fn role_config(&self, role: ConnectionRole, alias: Option<&str>) -> Option<ConnectionConfig>;

    /// Read replica aliases in rotation order.
    fn read_aliases(&self) -> Vec<String>;
}

/// In-process store with the administrative operations of a connection manager.
#[derive(Debug, Clone)]
pub struct MemoryConfigStore {
    db_type: DatabaseType,
    write: Option<ConnectionConfig>,
    read: Vec<(String, ConnectionConfig)>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new(db_type: DatabaseType) -> Self {
        Self {
            db_type,
            write: None,
            read: Vec::new(),
        }
    }

    #[must_use]
    pub fn database_type(&self) -> DatabaseType {
        self.db_type
    }

    /// Store parameters for `role`. Read replicas need an alphanumeric `alias`, stored lowercased;
    /// re-adding an alias replaces its parameters in place.
    ///
    /// # Errors
    /// `ConnectionManagerError` for a missing or malformed alias, `ConfigError` when the
    /// parameters fail validation.
    pub fn add_database(
        &mut self,
        role: ConnectionRole,
        raw: RawConnectionConfig,
        alias: Option<&str>,
    ) -> Result<(), SqlConduitError> {
        let config = ConnectionConfig::validate(raw, self.db_type)?;
        match role {
            ConnectionRole::Write => {
                self.write = Some(config);
            }
            ConnectionRole::Read => {
                let alias = normalize_alias(alias)?;
                match self.read.iter_mut().find(|(name, _)| *name == alias) {
                    Some(entry) => entry.1 = config,
                    None => self.read.push((alias, config)),
                }
            }
        }
        Ok(())
    }

    /// Remove the read replica `alias`.
    ///
    /// # Errors
    /// `ConnectionManagerError` when no replica has that alias.
    pub fn delete_database(&mut self, alias: &str) -> Result<(), SqlConduitError> {
        let alias = alias.to_ascii_lowercase();
        let before = self.read.len();
        self.read.retain(|(name, _)| *name != alias);
        if self.read.len() == before {
            return Err(SqlConduitError::ConnectionManagerError(format!(
                "No read-only database exists at {alias}"
            )));
        }
        Ok(())
    }

    /// # Errors
    /// `ConnectionManagerError` when nothing is stored for `role`/`alias`.
    pub fn get_database(
        &self,
        role: ConnectionRole,
        alias: Option<&str>,
    ) -> Result<ConnectionConfig, SqlConduitError> {
        self.role_config(role, alias).ok_or_else(|| {
            SqlConduitError::ConnectionManagerError(format!(
                "No database connection info exists for {role} {}",
                alias.unwrap_or_default()
            ))
        })
    }

    /// Alias → `user@host:port/dbname` for every read replica.
    #[must_use]
    pub fn list_read_replicas(&self) -> Vec<(String, String)> {
        self.read
            .iter()
            .map(|(alias, config)| (alias.clone(), config.describe()))
            .collect()
    }

    pub fn delete_all(&mut self) {
        self.write = None;
        self.read.clear();
    }
}

fn normalize_alias(alias: Option<&str>) -> Result<String, SqlConduitError> {
    match alias {
        Some(alias) if !alias.is_empty() && alias.chars().all(|c| c.is_ascii_alphanumeric()) => {
            Ok(alias.to_ascii_lowercase())
        }
        _ => Err(SqlConduitError::ConnectionManagerError(
            "When adding a read-only database connection you must specify an alpha-numeric alias \
             with no spaces or special characters."
                .to_string(),
        )),
    }
}

impl ConfigStore for MemoryConfigStore {
    fn role_config(&self, role: ConnectionRole, alias: Option<&str>) -> Option<ConnectionConfig> {
        match role {
            ConnectionRole::Write => self.write.clone(),
            ConnectionRole::Read => {
                let alias = alias?.to_ascii_lowercase();
                self.read
                    .iter()
                    .find(|(name, _)| *name == alias)
                    .map(|(_, config)| config.clone())
            }
        }
    }

    fn read_aliases(&self) -> Vec<String> {
        self.read.iter().map(|(alias, _)| alias.clone()).collect()
    }
}

/// On-disk layout: `{"write": {...}, "read": {"alias": {...}}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    write: Option<RawConnectionConfig>,
    #[serde(default)]
    read: BTreeMap<String, RawConnectionConfig>,
}

/// Connection parameters loaded from a JSON document.
///
/// Read replicas rotate in alias order.
#[derive(Debug, Clone)]
pub struct JsonConfigStore {
    inner: MemoryConfigStore,
}

impl JsonConfigStore {
    /// # Errors
    /// `ConfigError` when the document is not valid JSON or any entry fails validation.
    pub fn from_json_str(db_type: DatabaseType, json: &str) -> Result<Self, SqlConduitError> {
        let document: ConfigDocument = serde_json::from_str(json)
            .map_err(|e| SqlConduitError::ConfigError(format!("invalid config document: {e}")))?;

        let mut inner = MemoryConfigStore::new(db_type);
        if let Some(write) = document.write {
            inner.add_database(ConnectionRole::Write, write, None)?;
        }
        for (alias, raw) in document.read {
            inner.add_database(ConnectionRole::Read, raw, Some(&alias))?;
        }
        Ok(Self { inner })
    }

    /// # Errors
    /// `ConfigError` when the file cannot be read or parsed.
    pub fn from_path(db_type: DatabaseType, path: impl AsRef<Path>) -> Result<Self, SqlConduitError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            SqlConduitError::ConfigError(format!("unable to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(db_type, &json)
    }

    #[must_use]
    pub fn store(&self) -> &MemoryConfigStore {
        &self.inner
    }

    pub fn store_mut(&mut self) -> &mut MemoryConfigStore {
        &mut self.inner
    }

    /// Serialize the current contents back to the document layout.
    ///
    /// # Errors
    /// `ConfigError` if serialization fails.
    pub fn to_json(&self) -> Result<String, SqlConduitError> {
        let document = ConfigDocument {
            write: self.inner.write.as_ref().map(to_raw),
            read: self
                .inner
                .read
                .iter()
                .map(|(alias, config)| (alias.clone(), to_raw(config)))
                .collect(),
        };
        serde_json::to_string_pretty(&document)
            .map_err(|e| SqlConduitError::ConfigError(e.to_string()))
    }
}

fn to_raw(config: &ConnectionConfig) -> RawConnectionConfig {
    RawConnectionConfig {
        dbname: Some(config.dbname.clone()),
        user: Some(config.user.clone()),
        password: Some(config.password.clone()),
        host: Some(config.host.clone()),
        port: Some(config.port),
    }
}

impl ConfigStore for JsonConfigStore {
    fn role_config(&self, role: ConnectionRole, alias: Option<&str>) -> Option<ConnectionConfig> {
        self.inner.role_config(role, alias)
    }

    fn read_aliases(&self) -> Vec<String> {
        self.inner.read_aliases()
    }
}
