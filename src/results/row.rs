use std::collections::HashMap;
use std::sync::Arc;

use crate::types::{ColumnMeta, RowValues};

/// A row from a database query result
///
/// This struct represents a single row from a database query result,
/// with access to both the column metadata and the values.
#[derive(Debug, Clone)]
pub struct CustomDbRow {
    /// Column metadata (shared across all rows in a result set)
    pub columns: Arc<Vec<ColumnMeta>>,
    /// The values for this row
    pub rows: Vec<RowValues>,
    // Internal cache for faster column lookups (to avoid repeated string comparisons)
    #[doc(hidden)]
    pub(crate) column_index_cache: Arc<HashMap<String, usize>>,
}

impl CustomDbRow {
    /// Create a new database row
    ///
    /// # Arguments
    ///
    /// * `columns` - The column metadata
    /// * `rows` - The values for this row
    #[must_use]
    pub fn new(columns: Arc<Vec<ColumnMeta>>, rows: Vec<RowValues>) -> Self {
        let cache = Arc::new(index_columns(&columns));
        Self {
            columns,
            rows,
            column_index_cache: cache,
        }
    }

    pub(crate) fn with_cache(
        columns: Arc<Vec<ColumnMeta>>,
        cache: Arc<HashMap<String, usize>>,
        rows: Vec<RowValues>,
    ) -> Self {
        Self {
            columns,
            rows,
            column_index_cache: cache,
        }
    }

    /// Get the index of a column by name
    #[must_use]
    pub fn get_column_index(&self, column_name: &str) -> Option<usize> {
        if let Some(&idx) = self.column_index_cache.get(column_name) {
            return Some(idx);
        }

        // Fall back to a case-insensitive scan; SQL identifiers usually are.
        self.columns
            .iter()
            .position(|col| col.name.eq_ignore_ascii_case(column_name))
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

    /// Column names in order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Consume the row, keeping only its values.
    #[must_use]
    pub fn into_values(self) -> Vec<RowValues> {
        self.rows
    }
}

impl PartialEq for CustomDbRow {
    fn eq(&self, other: &Self) -> bool {
        self.rows == other.rows && self.columns == other.columns
    }
}

pub(crate) fn index_columns(columns: &[ColumnMeta]) -> HashMap<String, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(i, col)| (col.name.clone(), i))
        .collect()
}
