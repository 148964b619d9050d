use std::collections::BTreeMap;

use crate::results::{CustomDbRow, ResultSet};

/// Positionable, read-only iteration over one statement's result.
///
/// Results are materialised when the statement runs, so every backend supports absolute
/// positioning. For statements that returned no column metadata the cursor is empty and
/// [`ResultCursor::num_rows`] reports the affected-row count.
#[derive(Debug, Clone)]
pub struct ResultCursor {
    result: ResultSet,
    position: usize,
    closed: bool,
}

impl ResultCursor {
    /// Wrap a materialised result, positioned on its first row.
    ///
    /// # Arguments
    ///
    /// * `result` - The rows (or change count) a statement produced
    #[must_use]
    pub fn new(result: ResultSet) -> Self {
        Self {
            result,
            position: 0,
            closed: false,
        }
    }

    /// Move back to the first row.
    pub fn rewind(&mut self) {
        self.position = 0;
    }

    /// The row at the current position without advancing.
    #[must_use]
    pub fn current(&self) -> Option<&CustomDbRow> {
        if self.closed {
            return None;
        }
        self.result.results.get(self.position)
    }

    /// Whether [`ResultCursor::current`] has a row.
    #[must_use]
    pub fn valid(&self) -> bool {
        self.current().is_some()
    }

    /// Zero-based index of the current row.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Jump to an absolute row.
    ///
    /// # Arguments
    ///
    /// * `position` - Zero-based row index
    ///
    /// # Returns
    ///
    /// `true` when a row exists at `position`. The cursor moves there either way.
    pub fn seek(&mut self, position: usize) -> bool {
        self.position = position;
        self.valid()
    }

    /// Return the current row and advance.
    ///
    /// # Returns
    ///
    /// `None` once the cursor is past the last row or has been closed.
    pub fn fetch_row(&mut self) -> Option<CustomDbRow> {
        let row = self.current().cloned()?;
        self.position += 1;
        Some(row)
    }

    /// Column name → string value for the current row, then advance.
    ///
    /// Values are rendered with [`crate::RowValues::to_plain_string`]; `NULL` becomes an empty
    /// string.
    pub fn fetch_assoc(&mut self) -> Option<BTreeMap<String, String>> {
        let row = self.current().map(CustomDbRow::to_string_map)?;
        self.position += 1;
        Some(row)
    }

    /// Positional string values for the current row, then advance.
    pub fn fetch_array(&mut self) -> Option<Vec<String>> {
        let row = self.current().map(CustomDbRow::to_string_vec)?;
        self.position += 1;
        Some(row)
    }

    /// Row count of the result.
    ///
    /// # Returns
    ///
    /// The number of fetched rows when the statement returned column metadata, otherwise the
    /// backend's affected-row count.
    #[must_use]
    pub fn num_rows(&self) -> usize {
        if self.result.has_columns() {
            self.result.results.len()
        } else {
            self.result.rows_affected
        }
    }

    /// The driver's change count (equal to the row count for row-returning statements).
    #[must_use]
    pub fn rows_affected(&self) -> usize {
        self.result.rows_affected
    }

    /// Whether the statement returned column metadata.
    #[must_use]
    pub fn has_columns(&self) -> bool {
        self.result.has_columns()
    }

    /// Column names in result order; `None` for statements without a result set.
    #[must_use]
    pub fn column_names(&self) -> Option<&[String]> {
        self.result.get_column_names().map(|names| names.as_slice())
    }

    /// Release the buffered rows. Further fetches return nothing.
    pub fn close(&mut self) {
        self.closed = true;
        self.result.results = Vec::new();
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// The underlying [`ResultSet`], including rows already fetched.
    #[must_use]
    pub fn into_result_set(self) -> ResultSet {
        self.result
    }
}

impl Iterator for ResultCursor {
    type Item = CustomDbRow;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_row()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.closed {
            0
        } else {
            self.result.results.len().saturating_sub(self.position)
        };
        (remaining, Some(remaining))
    }
}

impl From<ResultSet> for ResultCursor {
    fn from(result: ResultSet) -> Self {
        Self::new(result)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::RowValues;

    fn users() -> ResultCursor {
        let mut rs = ResultSet::with_capacity(3);
        rs.set_column_names(Arc::new(vec!["id".into(), "name".into()]));
        rs.add_row_values(vec![RowValues::Int(1), RowValues::Text("alice".into())]);
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Text("bob".into())]);
        rs.add_row_values(vec![RowValues::Int(3), RowValues::Null]);
        ResultCursor::new(rs)
    }

    #[test]
    fn forward_iteration_and_rewind() {
        let mut cursor = users();
        assert_eq!(cursor.num_rows(), 3);
        let names: Vec<String> = cursor
            .by_ref()
            .map(|row| row.get("name").unwrap().to_plain_string())
            .collect();
        assert_eq!(names, vec!["alice", "bob", ""]);
        assert!(!cursor.valid());

        cursor.rewind();
        assert_eq!(cursor.current().unwrap().get("id"), Some(&RowValues::Int(1)));
    }

    #[test]
    fn absolute_positioning() {
        let mut cursor = users();
        assert!(cursor.seek(2));
        assert_eq!(cursor.fetch_array().unwrap(), vec!["3".to_string(), String::new()]);
        assert!(!cursor.seek(3));
        assert!(cursor.seek(1));
        let assoc = cursor.fetch_assoc().unwrap();
        assert_eq!(assoc["name"], "bob");
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn change_count_without_columns() {
        let cursor = ResultCursor::new(ResultSet::from_change_count(4));
        assert!(!cursor.has_columns());
        assert_eq!(cursor.num_rows(), 4);
        assert_eq!(cursor.column_names(), None);
        assert_eq!(cursor.size_hint(), (0, Some(0)));
    }

    #[test]
    fn close_releases_rows() {
        let mut cursor = users();
        cursor.close();
        assert!(cursor.is_closed());
        assert!(cursor.fetch_row().is_none());
        assert_eq!(cursor.column_names().unwrap(), ["id".to_string(), "name".to_string()]);
    }
}
