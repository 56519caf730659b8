//! Helper utilities for testing and development.

use crate::results::CustomDbRow;
use crate::types::{ColumnMeta, RowValues};
use std::sync::Arc;

/// Create a test row with the given column names and values.
///
/// Each column's type tag is inferred from the value in the same position.
#[must_use]
pub fn create_test_row(column_names: Vec<String>, values: Vec<RowValues>) -> CustomDbRow {
    let columns = column_names
        .into_iter()
        .zip(&values)
        .map(|(name, value)| ColumnMeta::new(name, value.type_tag()))
        .collect();
    CustomDbRow::new(Arc::new(columns), values)
}
