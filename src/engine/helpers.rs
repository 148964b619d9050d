//! CRUD and extraction helpers, built only on [`Engine::query`].

use std::collections::{BTreeMap, HashMap};

use super::Engine;
use crate::args::{Args, FieldMap};
use crate::error::SqlConduitError;
use crate::format::placeholder_for_column_type;
use crate::results::CustomDbRow;
use crate::types::RowValues;
use crate::validation::PlaceholderKind;

/// An `id` value meaning "let the database assign one".
fn is_unassigned_id(value: &RowValues) -> bool {
    match value {
        RowValues::Null => true,
        RowValues::Int(n) => *n == 0,
        RowValues::Float(n) => *n == 0.0,
        RowValues::Bool(b) => !b,
        RowValues::Text(text) => {
            let text = text.trim();
            text.is_empty() || text.parse::<i64>() == Ok(0)
        }
        RowValues::Timestamp(_) | RowValues::JSON(_) | RowValues::Blob(_) => false,
    }
}

impl Engine {
    /// Declared column types of an existing table, keyed by column name.
    fn writable_columns(&mut self, table: &str) -> Result<HashMap<String, String>, SqlConduitError> {
        if !self.check_table(table)? {
            return Err(SqlConduitError::TableNotExists(table.to_string()));
        }
        Ok(self.column_types(table)?.into_iter().collect())
    }

    /// Insert one or more rows. Every row is written with the columns of the first row; a key
    /// missing from a later row binds `NULL`.
    ///
    /// An `id` column whose value is zero or empty in every row is left out so the database
    /// assigns it.
    ///
    /// # Arguments
    ///
    /// * `table` - Target table; must exist
    /// * `rows` - Column name → value maps, one per row
    ///
    /// # Returns
    ///
    /// The number of inserted rows as reported by the backend.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use sql_conduit::prelude::*;
    /// # fn main() -> Result<(), SqlConduitError> {
    /// let mut db = Engine::sqlite(":memory:");
    /// db.query("CREATE TABLE tags (id INT NOT NULL PRIMARY KEY AUTO_INCREMENT, name TEXT)", ())?;
    /// let rows = [
    ///     FieldMap::from([("name".to_string(), RowValues::from("red"))]),
    ///     FieldMap::from([("name".to_string(), RowValues::from("blue"))]),
    /// ];
    /// assert_eq!(db.insert("tags", &rows)?, 2);
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    /// `TableNotExists`, `NoInsertData`, `ColumnNotExists`, or any error from [`Engine::query`].
    pub fn insert(&mut self, table: &str, rows: &[FieldMap]) -> Result<usize, SqlConduitError> {
        let columns = self.writable_columns(table)?;
        let Some(first) = rows.first().filter(|row| !row.is_empty()) else {
            return Err(SqlConduitError::NoInsertData(table.to_string()));
        };

        let keep_id = rows
            .iter()
            .any(|row| row.get("id").is_some_and(|id| !is_unassigned_id(id)));
        let mut insert_columns = Vec::with_capacity(first.len());
        for name in first.keys() {
            let column_type = columns.get(name).ok_or_else(|| SqlConduitError::ColumnNotExists {
                table: table.to_string(),
                column: name.clone(),
            })?;
            if name == "id" && !keep_id {
                continue;
            }
            insert_columns.push((name.as_str(), placeholder_for_column_type(column_type)));
        }
        if insert_columns.is_empty() {
            return Err(SqlConduitError::NoInsertData(table.to_string()));
        }

        let tuple = format!(
            "({})",
            insert_columns
                .iter()
                .map(|(_, kind)| kind.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        );
        let mut values = Vec::with_capacity(rows.len() * insert_columns.len());
        for row in rows {
            for (name, _) in &insert_columns {
                values.push(row.get(*name).cloned().unwrap_or(RowValues::Null));
            }
        }

        let sql = format!(
            "INSERT INTO {table} ({}) VALUES {}",
            insert_columns
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", "),
            vec![tuple; rows.len()].join(", ")
        );
        self.execute(&sql, values)
    }

    /// Insert `row`, or update the existing row with the same `id`.
    ///
    /// A zero or empty `id` makes this a plain [`Engine::insert`]. Otherwise every column but
    /// `id` is overwritten on conflict.
    ///
    /// # Arguments
    ///
    /// * `table` - Target table; must exist
    /// * `row` - Column name → value map, normally including `id`
    ///
    /// # Returns
    ///
    /// The backend's affected-row count. `MySQL` reports 2 for an update through
    /// `ON DUPLICATE KEY UPDATE`.
    ///
    /// # Errors
    /// Same as [`Engine::insert`].
    pub fn insert_or_update(&mut self, table: &str, row: &FieldMap) -> Result<usize, SqlConduitError> {
        if row.get("id").is_some_and(is_unassigned_id) {
            return self.insert(table, std::slice::from_ref(row));
        }
        let columns = self.writable_columns(table)?;
        if row.is_empty() {
            return Err(SqlConduitError::NoInsertData(table.to_string()));
        }

        let mut names = Vec::with_capacity(row.len());
        let mut placeholders = Vec::with_capacity(row.len());
        let mut assignments = Vec::with_capacity(row.len());
        let mut values = Vec::with_capacity(row.len() * 2);
        let mut update_values = Vec::with_capacity(row.len());
        for (name, value) in row {
            let column_type = columns.get(name).ok_or_else(|| SqlConduitError::ColumnNotExists {
                table: table.to_string(),
                column: name.clone(),
            })?;
            let kind = placeholder_for_column_type(column_type);
            names.push(name.as_str());
            values.push(value.clone());
            // the conflict target itself is not reassigned
            if name != "id" || row.len() == 1 {
                assignments.push(format!("{name} = {kind}"));
                update_values.push(value.clone());
            }
            placeholders.push(kind.to_string());
        }
        values.extend(update_values);

        let sql = format!(
            "INSERT INTO {table} ({}) VALUES ({}){}",
            names.join(", "),
            placeholders.join(", "),
            self.database_type().upsert_clause(&assignments)
        );
        self.execute(&sql, values)
    }

    /// Update columns of `table`.
    ///
    /// # Arguments
    ///
    /// * `table` - Target table; must exist
    /// * `updates` - Column name → new value
    /// * `where_clause` - Canonical SQL condition with placeholders; empty updates every row
    /// * `where_args` - Values for the condition's placeholders, bound after the updated values
    ///
    /// # Returns
    ///
    /// The number of updated rows.
    ///
    /// # Errors
    /// `TableNotExists`, `NoInsertData` for an empty update, `ColumnNotExists`, or any error
    /// from [`Engine::query`].
    pub fn update(
        &mut self,
        table: &str,
        updates: &FieldMap,
        where_clause: &str,
        where_args: &[RowValues],
    ) -> Result<usize, SqlConduitError> {
        let columns = self.writable_columns(table)?;
        if updates.is_empty() {
            return Err(SqlConduitError::NoInsertData(table.to_string()));
        }

        let mut assignments = Vec::with_capacity(updates.len());
        let mut values = Vec::with_capacity(updates.len() + where_args.len());
        for (name, value) in updates {
            let column_type = columns.get(name).ok_or_else(|| SqlConduitError::ColumnNotExists {
                table: table.to_string(),
                column: name.clone(),
            })?;
            assignments.push(format!("{name} = {}", placeholder_for_column_type(column_type)));
            values.push(value.clone());
        }
        values.extend_from_slice(where_args);

        let mut sql = format!("UPDATE {table} SET {}", assignments.join(", "));
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        self.execute(&sql, values)
    }

    /// Delete rows of `table`.
    ///
    /// # Arguments
    ///
    /// * `table` - Target table; must exist
    /// * `where_clause` - Canonical SQL condition with placeholders; empty deletes every row
    /// * `args` - Values for the condition's placeholders
    ///
    /// # Returns
    ///
    /// The number of deleted rows.
    ///
    /// # Errors
    /// `TableNotExists`, or any error from [`Engine::query`].
    pub fn delete(
        &mut self,
        table: &str,
        where_clause: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlConduitError> {
        if !self.check_table(table)? {
            return Err(SqlConduitError::TableNotExists(table.to_string()));
        }
        let mut sql = format!("DELETE FROM {table}");
        if !where_clause.trim().is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(where_clause);
        }
        self.execute(&sql, args)
    }

    /// First row of the result, if any.
    ///
    /// # Errors
    /// Any error from [`Engine::query`].
    pub fn get_row(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<Option<CustomDbRow>, SqlConduitError> {
        Ok(self.query(template, args)?.fetch_row())
    }

    /// Row of `table` whose `id_column` equals `id`.
    ///
    /// # Arguments
    ///
    /// * `table` - Table to read; must exist
    /// * `id` - Value to match; bound with the placeholder kind of the column's declared type
    /// * `id_column` - Column to match on; `None` or empty uses the table's primary key
    ///
    /// # Errors
    /// `TableNotExists`, `ObjectNotExists` when no column is given and the table has no primary
    /// key, or any error from [`Engine::query`].
    pub fn get_id_row(
        &mut self,
        table: &str,
        id: impl Into<RowValues>,
        id_column: Option<&str>,
    ) -> Result<Option<CustomDbRow>, SqlConduitError> {
        let columns = self.writable_columns(table)?;
        let column = match id_column.filter(|c| !c.is_empty()) {
            Some(column) => column.to_string(),
            None => self.primary_key(table)?.ok_or_else(|| {
                SqlConduitError::ObjectNotExists(format!(
                    "Unable to look up a row by id, as table '{table}' does not have a primary key"
                ))
            })?,
        };
        let kind = columns
            .get(&column)
            .map_or(PlaceholderKind::String, |ty| placeholder_for_column_type(ty));
        let sql = format!("SELECT * FROM {table} WHERE {column} = {kind} ORDER BY {column} LIMIT 1");
        self.get_row(&sql, [id.into()])
    }

    /// First column of every row.
    ///
    /// # Errors
    /// Any error from [`Engine::query`].
    pub fn get_column(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<Vec<RowValues>, SqlConduitError> {
        Ok(self
            .query(template, args)?
            .filter_map(|row| row.get_by_index(0).cloned())
            .collect())
    }

    /// First column → second column over every row. Later rows win on duplicate keys.
    ///
    /// # Errors
    /// Any error from [`Engine::query`].
    pub fn get_hash(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<BTreeMap<String, RowValues>, SqlConduitError> {
        let mut hash = BTreeMap::new();
        for row in self.query(template, args)? {
            let Some(key) = row.get_by_index(0) else {
                continue;
            };
            let value = row.get_by_index(1).cloned().unwrap_or(RowValues::Null);
            hash.insert(key.to_plain_string(), value);
        }
        Ok(hash)
    }

    /// First column of the first row.
    ///
    /// # Errors
    /// Any error from [`Engine::query`].
    pub fn get_field(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<Option<RowValues>, SqlConduitError> {
        Ok(self
            .get_row(template, args)?
            .and_then(|row| row.get_by_index(0).cloned()))
    }

    /// Evaluate a scalar SQL expression, e.g. `eval("1 + 1")`.
    ///
    /// # Errors
    /// Any error from [`Engine::query`].
    pub fn eval(&mut self, expression: &str) -> Result<Option<RowValues>, SqlConduitError> {
        self.get_field(&format!("SELECT {expression}"), ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unassigned_ids() {
        assert!(is_unassigned_id(&RowValues::Int(0)));
        assert!(is_unassigned_id(&RowValues::Null));
        assert!(is_unassigned_id(&RowValues::Text(String::new())));
        assert!(is_unassigned_id(&RowValues::Text(" 0 ".into())));
        assert!(!is_unassigned_id(&RowValues::Int(7)));
        assert!(!is_unassigned_id(&RowValues::Text("7".into())));
        assert!(!is_unassigned_id(&RowValues::Text("abc".into())));
    }
}
