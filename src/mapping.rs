//! Explicit row ↔ value mapping for domain types.
//!
//! Types opt in by implementing [`RowMapping`]; the engine's `*_object` helpers then move them
//! in and out of tables without any runtime discovery of fields.
//!
//! ```rust
//! use sql_conduit::prelude::*;
//! use sql_conduit::mapping::required;
//!
//! struct User {
//!     id: i64,
//!     status: String,
//! }
//!
//! impl RowMapping for User {
//!     fn to_row(&self) -> FieldMap {
//!         FieldMap::from([
//!             ("id".to_string(), RowValues::Int(self.id)),
//!             ("status".to_string(), RowValues::from(self.status.as_str())),
//!         ])
//!     }
//!
//!     fn from_row(row: &CustomDbRow) -> Result<Self, SqlConduitError> {
//!         Ok(User {
//!             id: required(row, "id")?.as_int().copied().unwrap_or_default(),
//!             status: required(row, "status")?.to_plain_string(),
//!         })
//!     }
//! }
//! ```

use crate::args::{Args, FieldMap};
use crate::cursor::ResultCursor;
use crate::engine::Engine;
use crate::error::SqlConduitError;
use crate::format::placeholder_for_column_type;
use crate::results::CustomDbRow;
use crate::types::RowValues;
use crate::validation::PlaceholderKind;

/// A domain type with a declared column mapping.
pub trait RowMapping: Sized {
    /// Column name → value for writing. Include `id` (zero when unassigned) for types keyed by it.
    fn to_row(&self) -> FieldMap;

    /// # Errors
    /// Typically `ObjectNotExists` (see [`required`]) when a needed column is absent.
    fn from_row(row: &CustomDbRow) -> Result<Self, SqlConduitError>;
}

/// The value of `column`, or `ObjectNotExists` naming it.
///
/// # Errors
/// `ObjectNotExists` when the row has no such column.
pub fn required<'a>(row: &'a CustomDbRow, column: &str) -> Result<&'a RowValues, SqlConduitError> {
    row.get(column).ok_or_else(|| {
        SqlConduitError::ObjectNotExists(format!("Result row has no column named '{column}'"))
    })
}

impl ResultCursor {
    /// Map the current row to `T` and advance.
    ///
    /// # Errors
    /// Whatever `T::from_row` reports.
    pub fn fetch_object<T: RowMapping>(&mut self) -> Result<Option<T>, SqlConduitError> {
        self.fetch_row().map(|row| T::from_row(&row)).transpose()
    }
}

impl Engine {
    /// First row of the result mapped to `T`.
    ///
    /// # Errors
    /// Any error from [`Engine::query`] or `T::from_row`.
    pub fn get_object<T: RowMapping>(
        &mut self,
        template: &str,
        args: impl Into<Args>,
    ) -> Result<Option<T>, SqlConduitError> {
        self.get_row(template, args)?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    /// Row of `table` with the given id, mapped to `T`; see [`Engine::get_id_row`].
    ///
    /// # Errors
    /// Any error from [`Engine::get_id_row`] or `T::from_row`.
    pub fn get_id_object<T: RowMapping>(
        &mut self,
        table: &str,
        id: impl Into<RowValues>,
        id_column: Option<&str>,
    ) -> Result<Option<T>, SqlConduitError> {
        self.get_id_row(table, id, id_column)?
            .map(|row| T::from_row(&row))
            .transpose()
    }

    /// Insert each object as one row.
    ///
    /// # Errors
    /// Same as [`Engine::insert`].
    pub fn insert_object<T: RowMapping>(
        &mut self,
        table: &str,
        objects: &[T],
    ) -> Result<usize, SqlConduitError> {
        let rows: Vec<FieldMap> = objects.iter().map(RowMapping::to_row).collect();
        self.insert(table, &rows)
    }

    /// Update the row matching the object's primary key with the rest of its fields.
    ///
    /// # Errors
    /// `ObjectNotExists` when the table has no primary key or the object carries no value for
    /// it, otherwise the same as [`Engine::update`].
    pub fn update_object<T: RowMapping>(
        &mut self,
        table: &str,
        object: &T,
    ) -> Result<usize, SqlConduitError> {
        let (key, id, mut row) = self.keyed_row(table, object, "update")?;
        row.remove(&key);
        let kind = self.key_kind(table, &key)?;
        self.update(table, &row, &format!("{key} = {kind}"), &[id])
    }

    /// Delete the row matching the object's primary key.
    ///
    /// # Errors
    /// `ObjectNotExists` when the table has no primary key or the object carries no value for
    /// it, otherwise the same as [`Engine::delete`].
    pub fn delete_object<T: RowMapping>(
        &mut self,
        table: &str,
        object: &T,
    ) -> Result<usize, SqlConduitError> {
        let (key, id, _) = self.keyed_row(table, object, "delete")?;
        let kind = self.key_kind(table, &key)?;
        self.delete(table, &format!("{key} = {kind}"), &[id])
    }

    fn keyed_row<T: RowMapping>(
        &mut self,
        table: &str,
        object: &T,
        action: &str,
    ) -> Result<(String, RowValues, FieldMap), SqlConduitError> {
        let key = self.primary_key(table)?.ok_or_else(|| {
            SqlConduitError::ObjectNotExists(format!(
                "Unable to perform {action} as table '{table}' does not have a primary key"
            ))
        })?;
        let row = object.to_row();
        let id = row
            .get(&key)
            .filter(|id| !id.is_null())
            .cloned()
            .ok_or_else(|| {
                SqlConduitError::ObjectNotExists(format!(
                    "Unable to perform {action}, as the object has no '{key}' value"
                ))
            })?;
        Ok((key, id, row))
    }

    fn key_kind(
        &mut self,
        table: &str,
        key: &str,
    ) -> Result<PlaceholderKind, SqlConduitError> {
        Ok(self
            .column_types(table)?
            .into_iter()
            .find(|(name, _)| name == key)
            .map_or(PlaceholderKind::String, |(_, ty)| placeholder_for_column_type(&ty)))
    }
}
