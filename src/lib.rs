//! Role-routed SQL execution over `SQLite`, `PostgreSQL` and caller-supplied backends.
//!
//! Callers write one canonical (MySQL-flavoured) SQL dialect with typed `%kind` placeholders.
//! The [`Engine`] routes each statement to a read or write connection, converts it to the
//! backend dialect, binds the validated arguments and hands back a [`ResultCursor`].

pub mod args;
pub mod backend;
pub mod config;
pub mod config_store;
pub mod cursor;
pub mod dialect;
pub mod engine;
pub mod error;
pub mod format;
pub mod mapping;
pub mod prelude;
pub mod results;
pub mod router;
pub mod transaction;
pub mod types;
pub mod validation;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use args::{Args, FieldMap};
pub use backend::{Backend, Connector, ExecuteError, PreparedHandle};
pub use config::{ConnectionConfig, EngineOptions, RawConnectionConfig};
pub use config_store::{ConfigStore, JsonConfigStore, MemoryConfigStore};
pub use cursor::ResultCursor;
pub use dialect::{ConvertedSql, convert};
pub use engine::Engine;
pub use error::{BackendError, SqlConduitError};
pub use format::{
    BoundData, BoundValue, FormattedStatement, format_statement, placeholder_for_column_type,
    split_sql_statements, strip_leading_comments,
};
pub use mapping::RowMapping;
pub use results::{CustomDbRow, ResultSet};
pub use router::{ConnectionRouter, RoutedConnection};
pub use types::{ConnectionRole, DatabaseType, RowValues, TimePeriod};
pub use validation::PlaceholderKind;
