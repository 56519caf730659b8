use std::collections::HashMap;
use std::sync::Arc;

use super::row::{CustomDbRow, index_columns};
use crate::types::{ColumnMeta, RowValues};

/// A result set from a database query
///
/// This struct represents the result of a query, containing the rows
/// returned by the query and the column metadata shared by every row.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column metadata shared by all rows (to avoid duplicating in each row)
    columns: Option<Arc<Vec<ColumnMeta>>>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create a new result set with a known capacity
    #[must_use]
    pub fn with_capacity(capacity: usize) -> ResultSet {
        ResultSet {
            results: Vec::with_capacity(capacity),
            ..ResultSet::default()
        }
    }

    /// Set the column metadata for this result set (to be shared by all rows)
    pub fn set_columns(&mut self, columns: Arc<Vec<ColumnMeta>>) {
        self.column_index_cache = Arc::new(index_columns(&columns));
        self.columns = Some(columns);
    }

    /// Get the column metadata for this result set
    #[must_use]
    pub fn get_columns(&self) -> Option<&Arc<Vec<ColumnMeta>>> {
        self.columns.as_ref()
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn get_column_names(&self) -> Vec<&str> {
        self.columns
            .iter()
            .flat_map(|cols| cols.iter().map(|c| c.name.as_str()))
            .collect()
    }

    /// Add a row to the result set
    ///
    /// Rows are only accepted once column metadata has been set.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) {
        if let Some(columns) = &self.columns {
            let row = CustomDbRow::with_cache(
                Arc::clone(columns),
                Arc::clone(&self.column_index_cache),
                row_values,
            );
            self.results.push(row);
        }
    }

    /// Add an already built row to the result set
    pub fn add_row(&mut self, row: CustomDbRow) {
        // If column metadata hasn't been set yet, use the row's
        if self.columns.is_none() {
            self.set_columns(Arc::clone(&row.columns));
        }

        self.results.push(row);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Row values as plain tuples, dropping column metadata.
    #[must_use]
    pub fn values(&self) -> Vec<Vec<RowValues>> {
        self.results.iter().map(|r| r.rows.clone()).collect()
    }
}

impl PartialEq for ResultSet {
    fn eq(&self, other: &Self) -> bool {
        self.results == other.results && self.columns == other.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_row;

    #[test]
    fn add_row_adopts_row_columns() {
        let mut rs = ResultSet::with_capacity(2);
        assert!(rs.is_empty());
        rs.add_row(create_test_row(
            vec!["id".into(), "name".into()],
            vec![RowValues::Int(1), RowValues::Text("alice".into())],
        ));
        rs.add_row_values(vec![RowValues::Int(2), RowValues::Null]);

        assert_eq!(rs.len(), 2);
        assert_eq!(rs.get_column_names(), vec!["id", "name"]);
        assert_eq!(rs.results[1].get("NAME"), Some(&RowValues::Null));
        assert_eq!(
            rs.values(),
            vec![
                vec![RowValues::Int(1), RowValues::Text("alice".into())],
                vec![RowValues::Int(2), RowValues::Null],
            ]
        );
    }

    #[test]
    fn values_without_columns_are_dropped() {
        let mut rs = ResultSet::default();
        rs.add_row_values(vec![RowValues::Int(1)]);
        assert!(rs.is_empty());
    }
}
