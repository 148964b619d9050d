use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::types::RowValues;

/// A row from a query result.
///
/// Column names and the name→index map are shared by every row of one result set.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// The column names for this row (shared across all rows in a result set)
    pub column_names: Arc<Vec<String>>,
    /// The values for this row, in column order
    pub rows: Vec<RowValues>,
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a row, building a fresh column index.
    ///
    /// Prefer [`crate::results::ResultSet::add_row_values`] when producing many rows with the
    /// same columns.
    #[must_use]
    pub fn new(column_names: Arc<Vec<String>>, rows: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_columns(&column_names));
        Self {
            column_names,
            rows,
            column_index_cache: cache,
        }
    }

    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        self.column_index_cache.get(column_name).copied()
    }

    /// Get a value from the row by column name
    #[must_use]
    pub fn get(&self, column_name: &str) -> Option<&RowValues> {
        self.get_column_index(column_name)
            .and_then(|idx| self.rows.get(idx))
    }

    /// Get a value from the row by column index
    #[must_use]
    pub fn get_by_index(&self, index: usize) -> Option<&RowValues> {
        self.rows.get(index)
    }

    /// Column name → string value, the shape handed to result-mapping code.
    ///
    /// NULL renders as the empty string; see [`RowValues::to_plain_string`].
    #[must_use]
    pub fn to_string_map(&self) -> BTreeMap<String, String> {
        self.column_names
            .iter()
            .zip(&self.rows)
            .map(|(name, value)| (name.clone(), value.to_plain_string()))
            .collect()
    }

    /// Positional string values.
    #[must_use]
    pub fn to_string_vec(&self) -> Vec<String> {
        self.rows.iter().map(RowValues::to_plain_string).collect()
    }

    /// Number of columns in the row.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub(crate) fn index_columns(column_names: &[String]) -> HashMap<String, usize> {
    let mut map = HashMap::with_capacity(column_names.len());
    for (i, name) in column_names.iter().enumerate() {
        // first occurrence wins for duplicated names (e.g. `SELECT rowid, *` with an `id` alias)
        map.entry(name.clone()).or_insert(i);
    }
    map
}
