use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use super::Engine;
use crate::error::SqlConduitError;
use crate::format::strip_leading_comments;
use crate::types::{RowValues, TimePeriod};

/// Per-engine memo of schema lookups; cleared by [`Engine::clear_cache`].
#[derive(Debug, Default)]
pub(crate) struct SchemaCache {
    tables: Option<Vec<String>>,
    columns: HashMap<String, Vec<(String, String)>>,
    primary_keys: HashMap<String, Option<String>>,
}

static SCHEMA_CHANGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(create|alter|drop|rename)\s").unwrap());

impl SchemaCache {
    pub(crate) fn clear(&mut self) {
        *self = Self::default();
    }

    /// Drop cached lookups when `sql` may have changed the schema.
    pub(crate) fn invalidate_for(&mut self, sql: &str) {
        if SCHEMA_CHANGE_RE.is_match(strip_leading_comments(sql)) {
            self.clear();
        }
    }
}

impl Engine {
    /// Tables in the current database.
    ///
    /// # Errors
    /// Any error from running the backend's table listing.
    pub fn table_names(&mut self) -> Result<Vec<String>, SqlConduitError> {
        if let Some(tables) = &self.schema.tables {
            return Ok(tables.clone());
        }
        let sql = self.database_type().list_tables_sql();
        let tables: Vec<String> = self
            .query(sql, ())?
            .filter_map(|row| row.get_by_index(0).map(RowValues::to_plain_string))
            .collect();
        self.schema.tables = Some(tables.clone());
        Ok(tables)
    }

    /// Whether `table` exists (from the cached table list).
    ///
    /// # Errors
    /// Any error from [`Engine::table_names`].
    pub fn check_table(&mut self, table: &str) -> Result<bool, SqlConduitError> {
        Ok(self.table_names()?.iter().any(|name| name == table))
    }

    /// `(column, declared type)` pairs of `table`, in column order.
    ///
    /// # Errors
    /// Any error from running the backend's column description.
    pub fn column_types(&mut self, table: &str) -> Result<Vec<(String, String)>, SqlConduitError> {
        if let Some(columns) = self.schema.columns.get(table) {
            return Ok(columns.clone());
        }
        let sql = self.database_type().describe_columns_sql();
        let columns: Vec<(String, String)> = self
            .query(sql, [RowValues::from(table)])?
            .map(|row| {
                let text = |idx| row.get_by_index(idx).map(RowValues::to_plain_string);
                (text(0).unwrap_or_default(), text(1).unwrap_or_default())
            })
            .collect();
        // an empty answer usually means the table is missing; do not pin that
        if !columns.is_empty() {
            self.schema.columns.insert(table.to_string(), columns.clone());
        }
        Ok(columns)
    }

    /// Column names of `table`, in column order.
    ///
    /// # Errors
    /// Any error from [`Engine::column_types`].
    pub fn column_names(&mut self, table: &str) -> Result<Vec<String>, SqlConduitError> {
        Ok(self
            .column_types(table)?
            .into_iter()
            .map(|(name, _)| name)
            .collect())
    }

    /// First primary key column of `table`, if it has one.
    ///
    /// # Errors
    /// Any error from running the backend's primary key lookup.
    pub fn primary_key(&mut self, table: &str) -> Result<Option<String>, SqlConduitError> {
        if let Some(key) = self.schema.primary_keys.get(table) {
            return Ok(key.clone());
        }
        let sql = self.database_type().primary_key_sql();
        let key = self
            .query(sql, [RowValues::from(table)])?
            .next()
            .and_then(|row| row.get_by_index(0).map(RowValues::to_plain_string));
        self.schema.primary_keys.insert(table.to_string(), key.clone());
        Ok(key)
    }

    /// `from` moved forward by `length` periods, as `YYYY-MM-DD HH:MM:SS` or, with
    /// `as_timestamp`, Unix seconds.
    ///
    /// # Errors
    /// `InvalidArgument` for a malformed date, or the backend's error.
    pub fn add_time(
        &mut self,
        period: TimePeriod,
        length: i64,
        from: &str,
        as_timestamp: bool,
    ) -> Result<String, SqlConduitError> {
        let sql = self
            .database_type()
            .date_arithmetic_sql(period, length, as_timestamp);
        Ok(self
            .get_field(&sql, [RowValues::from(from)])?
            .map(|value| value.to_plain_string())
            .unwrap_or_default())
    }

    /// `from` moved back by `length` periods; see [`Engine::add_time`].
    ///
    /// # Errors
    /// Same as [`Engine::add_time`].
    pub fn subtract_time(
        &mut self,
        period: TimePeriod,
        length: i64,
        from: &str,
        as_timestamp: bool,
    ) -> Result<String, SqlConduitError> {
        self.add_time(period, length.saturating_neg(), from, as_timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_invalidates() {
        let mut cache = SchemaCache {
            tables: Some(vec!["users".into()]),
            ..SchemaCache::default()
        };
        cache.invalidate_for("SELECT * FROM users");
        assert!(cache.tables.is_some());
        cache.invalidate_for("  create table t (a int)");
        assert!(cache.tables.is_none());

        cache.tables = Some(vec!["users".into()]);
        cache.invalidate_for("-- migration\n/* v2 */ DROP TABLE users");
        assert!(cache.tables.is_none());
    }
}
