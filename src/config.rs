use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SqlConduitError;
use crate::types::{ConnectionRole, DatabaseType};

/// Connection parameters as supplied by a caller or config store; every field is optional until
/// validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawConnectionConfig {
    #[serde(default)]
    pub dbname: Option<String>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Validated connection parameters for one physical connection.
///
/// For `SQLite`, `dbname` is the database path (or `:memory:`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub dbname: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl ConnectionConfig {
    /// Apply defaults and check required fields.
    ///
    /// # Errors
    /// `ConfigError` when `dbname` is missing or empty, or when `user` is missing for a backend
    /// that needs one.
    pub fn validate(
        raw: RawConnectionConfig,
        db_type: DatabaseType,
    ) -> Result<Self, SqlConduitError> {
        let dbname = raw
            .dbname
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| SqlConduitError::ConfigError("dbname is required".to_string()))?;

        let user = match raw.user {
            Some(user) => user,
            None if db_type.requires_user() => {
                return Err(SqlConduitError::ConfigError(format!(
                    "user is required for {db_type}"
                )));
            }
            None => String::new(),
        };

        Ok(Self {
            dbname,
            user,
            password: raw.password.unwrap_or_default(),
            host: raw
                .host
                .filter(|host| !host.is_empty())
                .unwrap_or_else(|| "localhost".to_string()),
            port: raw.port.unwrap_or_else(|| db_type.default_port()),
        })
    }

    /// Config for a `SQLite` database file (or `:memory:`).
    #[must_use]
    pub fn sqlite(path: impl Into<String>) -> Self {
        Self {
            dbname: path.into(),
            user: String::new(),
            password: String::new(),
            host: "localhost".to_string(),
            port: DatabaseType::Sqlite.default_port(),
        }
    }

    /// `user@host:port/dbname`, safe to log.
    #[must_use]
    pub fn describe(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

/// Called with the role, the config and the driver message when a connection attempt fails,
/// before the error is returned.
pub type ConnectFailHook = Arc<dyn Fn(ConnectionRole, &ConnectionConfig, &str) + Send + Sync>;

/// Session settings applied when a physical connection is opened.
#[derive(Clone)]
pub struct EngineOptions {
    /// Client encoding (Postgres `SET CLIENT_ENCODING`).
    pub charset: String,
    /// Session time zone offset such as `+0:00`.
    pub timezone_offset: String,
    on_connect_fail: Option<ConnectFailHook>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            charset: "utf8".to_string(),
            timezone_offset: "+0:00".to_string(),
            on_connect_fail: None,
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_charset(mut self, charset: impl Into<String>) -> Self {
        self.charset = charset.into();
        self
    }

    #[must_use]
    pub fn with_timezone_offset(mut self, offset: impl Into<String>) -> Self {
        self.timezone_offset = offset.into();
        self
    }

    #[must_use]
    pub fn with_on_connect_fail<F>(mut self, hook: F) -> Self
    where
        F: Fn(ConnectionRole, &ConnectionConfig, &str) + Send + Sync + 'static,
    {
        self.on_connect_fail = Some(Arc::new(hook));
        self
    }

    pub(crate) fn notify_connect_failure(
        &self,
        role: ConnectionRole,
        config: &ConnectionConfig,
        message: &str,
    ) {
        if let Some(hook) = &self.on_connect_fail {
            hook(role, config, message);
        }
    }
}

impl fmt::Debug for EngineOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineOptions")
            .field("charset", &self.charset)
            .field("timezone_offset", &self.timezone_offset)
            .field("on_connect_fail", &self.on_connect_fail.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn defaults_are_applied() {
        let raw = RawConnectionConfig {
            dbname: Some("app".into()),
            user: Some("app_user".into()),
            ..RawConnectionConfig::default()
        };
        let cfg = ConnectionConfig::validate(raw.clone(), DatabaseType::Postgres).unwrap();
        assert_eq!(cfg.password, "");
        assert_eq!(cfg.host, "localhost");
        assert_eq!(cfg.port, 5432);
        assert_eq!(cfg.describe(), "app_user@localhost:5432/app");

        let cfg = ConnectionConfig::validate(raw, DatabaseType::MySql).unwrap();
        assert_eq!(cfg.port, 3306);
    }

    #[test]
    fn required_fields() {
        let err = ConnectionConfig::validate(RawConnectionConfig::default(), DatabaseType::Sqlite)
            .unwrap_err();
        assert!(matches!(err, SqlConduitError::ConfigError(_)));

        let raw = RawConnectionConfig {
            dbname: Some("app".into()),
            ..RawConnectionConfig::default()
        };
        assert!(ConnectionConfig::validate(raw.clone(), DatabaseType::Postgres).is_err());
        let sqlite = ConnectionConfig::validate(raw, DatabaseType::Sqlite).unwrap();
        assert_eq!(sqlite.user, "");
    }

    #[test]
    fn password_is_redacted() {
        let mut cfg = ConnectionConfig::sqlite(":memory:");
        cfg.password = "hunter2".into();
        assert!(!format!("{cfg:?}").contains("hunter2"));
    }

    #[test]
    fn deserializes_partial_json() {
        let raw: RawConnectionConfig =
            serde_json::from_str(r#"{"dbname": "app", "user": "u", "port": 6543}"#).unwrap();
        let cfg = ConnectionConfig::validate(raw, DatabaseType::Postgres).unwrap();
        assert_eq!(cfg.port, 6543);
    }

    #[test]
    fn connect_fail_hook_is_called() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let opts = EngineOptions::new().with_on_connect_fail(move |role, _cfg, msg| {
            assert_eq!(role, ConnectionRole::Read);
            assert_eq!(msg, "refused");
            seen.fetch_add(1, Ordering::SeqCst);
        });
        opts.notify_connect_failure(
            ConnectionRole::Read,
            &ConnectionConfig::sqlite(":memory:"),
            "refused",
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
