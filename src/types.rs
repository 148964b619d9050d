use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::SqlConduitError;
use crate::validation::PlaceholderKind;

/// Values that can be stored in a database row or supplied as placeholder arguments.
///
/// The same enum is used for arguments and for result rows so helpers never branch on driver
/// types:
/// ```rust
/// use sql_conduit::prelude::*;
///
/// let params = vec![
///     RowValues::Int(1),
///     RowValues::Text("alice".into()),
///     RowValues::Bool(true),
/// ];
/// # let _ = params;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<chrono::NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            if let Ok(dt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S.%3f") {
                return Some(dt);
            }
        }
        None
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        if let RowValues::Float(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// String rendering used by result mapping and by the placeholder validator.
    ///
    /// Booleans render as `1`/`0`, timestamps as `YYYY-MM-DD HH:MM:SS`, NULL as the empty string.
    /// Blobs are decoded lossily.
    #[must_use]
    pub fn to_plain_string(&self) -> String {
        match self {
            RowValues::Int(i) => i.to_string(),
            RowValues::Float(f) => f.to_string(),
            RowValues::Text(s) => s.clone(),
            RowValues::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            RowValues::Timestamp(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            RowValues::Null => String::new(),
            RowValues::JSON(v) => v.to_string(),
            RowValues::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

/// Which physical connection a statement runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionRole {
    /// The single write (primary) target.
    Write,
    /// A read replica; falls back to [`ConnectionRole::Write`] when none is configured.
    Read,
}

impl fmt::Display for ConnectionRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionRole::Write => f.write_str("write"),
            ConnectionRole::Read => f.write_str("read"),
        }
    }
}

/// The backend flavours understood by the formatter and dialect converter.
///
/// Driver-specific behaviour is answered here by value instead of by inspecting concrete
/// connection types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `MySQL`/`MariaDB`; the canonical dialect. No driver ships with this crate.
    #[value(name = "mysql")]
    MySql,
    /// `PostgreSQL` database
    Postgres,
    /// `SQLite` database
    Sqlite,
}

impl DatabaseType {
    /// Backend-native marker for the `position`-th (1-based) bound parameter.
    #[must_use]
    pub fn placeholder(self, position: usize) -> String {
        match self {
            DatabaseType::Postgres => format!("${position}"),
            DatabaseType::MySql | DatabaseType::Sqlite => "?".to_string(),
        }
    }

    /// Implicit row identifier used in place of an auto-increment `id` column.
    #[must_use]
    pub fn row_identifier_column(self) -> Option<&'static str> {
        match self {
            DatabaseType::Sqlite => Some("rowid"),
            DatabaseType::MySql | DatabaseType::Postgres => None,
        }
    }

    #[must_use]
    pub fn supports_returning_clause(self) -> bool {
        matches!(self, DatabaseType::Postgres | DatabaseType::Sqlite)
    }

    #[must_use]
    pub fn default_port(self) -> u16 {
        match self {
            DatabaseType::Postgres => 5432,
            DatabaseType::MySql | DatabaseType::Sqlite => 3306,
        }
    }

    /// Whether a connection config must name a user.
    #[must_use]
    pub fn requires_user(self) -> bool {
        !matches!(self, DatabaseType::Sqlite)
    }

    /// Upsert tail appended after `INSERT ... VALUES (...)`, given the `col = <token>` pairs.
    #[must_use]
    pub fn upsert_clause(self, assignments: &[String]) -> String {
        match self {
            DatabaseType::Postgres | DatabaseType::Sqlite => {
                format!(" ON CONFLICT (id) DO UPDATE SET {}", assignments.join(", "))
            }
            DatabaseType::MySql => {
                format!(" ON DUPLICATE KEY UPDATE {}", assignments.join(", "))
            }
        }
    }

    /// Lists table names in the current database (first column).
    #[must_use]
    pub fn list_tables_sql(self) -> &'static str {
        match self {
            DatabaseType::MySql => "SHOW TABLES",
            DatabaseType::Postgres => {
                "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public'"
            }
            DatabaseType::Sqlite => {
                "SELECT name FROM sqlite_master WHERE type = 'table' \
                 AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' ORDER BY name"
            }
        }
    }

    /// Template returning `(column name, declared type)` rows for the table bound to its `%s`.
    #[must_use]
    pub fn describe_columns_sql(self) -> &'static str {
        match self {
            DatabaseType::MySql => {
                "SELECT COLUMN_NAME, COLUMN_TYPE FROM information_schema.COLUMNS \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = %s ORDER BY ORDINAL_POSITION"
            }
            DatabaseType::Postgres => {
                "SELECT column_name, data_type FROM information_schema.columns \
                 WHERE table_schema = 'public' AND table_name = %s ORDER BY ordinal_position"
            }
            DatabaseType::Sqlite => "SELECT name, type FROM pragma_table_info(%s) ORDER BY cid",
        }
    }

    /// Template returning the primary key column(s) of the table bound to its `%s`.
    #[must_use]
    pub fn primary_key_sql(self) -> &'static str {
        match self {
            DatabaseType::MySql => {
                "SELECT COLUMN_NAME FROM information_schema.KEY_COLUMN_USAGE \
                 WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = %s AND CONSTRAINT_NAME = 'PRIMARY' \
                 ORDER BY ORDINAL_POSITION"
            }
            DatabaseType::Postgres => {
                "SELECT kcu.column_name FROM information_schema.table_constraints tc \
                 JOIN information_schema.key_column_usage kcu \
                 ON tc.constraint_name = kcu.constraint_name AND tc.table_schema = kcu.table_schema \
                 WHERE tc.constraint_type = 'PRIMARY KEY' AND tc.table_schema = 'public' \
                 AND tc.table_name = %s ORDER BY kcu.ordinal_position"
            }
            DatabaseType::Sqlite => "SELECT name FROM pragma_table_info(%s) WHERE pk > 0 ORDER BY pk",
        }
    }

    /// Template shifting the date bound to its `%s` by `length` periods (negative moves back).
    ///
    /// The result is a `YYYY-MM-DD HH:MM:SS` datetime, or Unix seconds when `as_timestamp`.
    #[must_use]
    pub fn date_arithmetic_sql(self, period: TimePeriod, length: i64, as_timestamp: bool) -> String {
        let (amount, unit) = period.normalized(length);
        match self {
            DatabaseType::MySql => {
                let unit = period.as_str().to_ascii_uppercase();
                let shifted = format!("DATE_ADD(%s, INTERVAL {length} {unit})");
                if as_timestamp {
                    format!("SELECT UNIX_TIMESTAMP({shifted})")
                } else {
                    format!("SELECT {shifted}")
                }
            }
            DatabaseType::Postgres => {
                let shifted = format!("CAST(%s AS TIMESTAMP) + INTERVAL '{amount} {unit}'");
                if as_timestamp {
                    format!("SELECT CAST(EXTRACT(EPOCH FROM {shifted}) AS BIGINT)")
                } else {
                    format!("SELECT {shifted}")
                }
            }
            DatabaseType::Sqlite => {
                let shifted = format!("datetime(%s, '{amount:+} {unit}s')");
                if as_timestamp {
                    format!("SELECT CAST(strftime('%s', {shifted}) AS INTEGER)")
                } else {
                    format!("SELECT {shifted}")
                }
            }
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseType::MySql => f.write_str("mysql"),
            DatabaseType::Postgres => f.write_str("postgres"),
            DatabaseType::Sqlite => f.write_str("sqlite"),
        }
    }
}

/// Unit for date arithmetic helpers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimePeriod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimePeriod::Second => "second",
            TimePeriod::Minute => "minute",
            TimePeriod::Hour => "hour",
            TimePeriod::Day => "day",
            TimePeriod::Week => "week",
            TimePeriod::Month => "month",
            TimePeriod::Quarter => "quarter",
            TimePeriod::Year => "year",
        }
    }

    /// `length` re-expressed in a unit every backend understands (weeks as days, quarters as
    /// months).
    fn normalized(self, length: i64) -> (i64, &'static str) {
        match self {
            TimePeriod::Week => (length.saturating_mul(7), "day"),
            TimePeriod::Quarter => (length.saturating_mul(3), "month"),
            other => (length, other.as_str()),
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = SqlConduitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "second" => Ok(TimePeriod::Second),
            "minute" => Ok(TimePeriod::Minute),
            "hour" => Ok(TimePeriod::Hour),
            "day" => Ok(TimePeriod::Day),
            "week" => Ok(TimePeriod::Week),
            "month" => Ok(TimePeriod::Month),
            "quarter" => Ok(TimePeriod::Quarter),
            "year" => Ok(TimePeriod::Year),
            _ => Err(SqlConduitError::InvalidArgument {
                kind: PlaceholderKind::Other("period".to_string()),
                value: s.to_string(),
                sql: String::new(),
            }),
        }
    }
}
