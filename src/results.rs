// Result materializer
//
// - row: `CustomDbRow`, one typed row sharing its result set's column metadata
// - result_set: `ResultSet`, the materialized rows of one statement
//
// The functions below turn native cursors into those types.

mod result_set;
mod row;

use std::sync::Arc;

pub use result_set::ResultSet;
pub use row::CustomDbRow;

pub(crate) use row::index_columns;

use crate::driver::{COUNT_ERROR, NativeResultSet};
use crate::error::{Diagnostic, SqlEngineError};
use crate::types::{ColumnMeta, RowFormat, RowValues, decode_value};

// Upper bound on preallocation; drivers may report huge row counts.
const MAX_PREALLOCATED_ROWS: usize = 1024;

/// Drain a native result set into a [`ResultSet`].
///
/// Column metadata is read once and shared by every row.
///
/// # Errors
///
/// Returns `SqlEngineError::InterfaceError` if a row's width disagrees with the
/// column metadata and `SqlEngineError::TypeMappingError` if a column buffer
/// cannot be decoded.
pub fn materialize<R: NativeResultSet>(native: &mut R) -> Result<ResultSet, SqlEngineError> {
    let columns = Arc::new(native.fields());
    let format = native.format();
    let capacity = usize::try_from(native.num_rows())
        .unwrap_or(MAX_PREALLOCATED_ROWS)
        .min(MAX_PREALLOCATED_ROWS);

    let mut result_set = ResultSet::with_capacity(capacity);
    result_set.set_columns(Arc::clone(&columns));

    while let Some(raw) = native.fetch_row() {
        let values = decode_row(&columns, &raw, format)?;
        tracing::trace!(columns = columns.len(), "materialized row");
        result_set.add_row_values(values);
    }

    Ok(result_set)
}

/// Decode one raw row using the result set's column metadata.
///
/// # Errors
///
/// See [`materialize`].
pub fn decode_row(
    columns: &[ColumnMeta],
    raw: &[Option<Vec<u8>>],
    format: RowFormat,
) -> Result<Vec<RowValues>, SqlEngineError> {
    if raw.len() != columns.len() {
        return Err(SqlEngineError::interface(format!(
            "row has {} columns but the result set declares {}",
            raw.len(),
            columns.len()
        )));
    }
    columns
        .iter()
        .zip(raw)
        .map(|(column, buffer)| decode_value(column, buffer.as_deref(), format))
        .collect()
}

/// Reject the "count unavailable" sentinel.
///
/// # Errors
///
/// Returns `SqlEngineError::InternalError` with the driver's diagnostic when
/// `count` is [`COUNT_ERROR`].
pub fn checked_count(
    count: u64,
    diagnostic: impl FnOnce() -> Diagnostic,
) -> Result<u64, SqlEngineError> {
    if count == COUNT_ERROR {
        let mut diag = diagnostic();
        if diag.message.is_empty() {
            diag.message = "driver failed to report a row count".to_string();
        }
        return Err(SqlEngineError::InternalError(diag));
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeTag;

    struct Cursor {
        columns: Vec<ColumnMeta>,
        rows: std::vec::IntoIter<Vec<Option<Vec<u8>>>>,
    }

    impl NativeResultSet for Cursor {
        fn num_rows(&self) -> u64 {
            u64::MAX
        }
        fn fields(&self) -> Vec<ColumnMeta> {
            self.columns.clone()
        }
        fn fetch_row(&mut self) -> Option<Vec<Option<Vec<u8>>>> {
            self.rows.next()
        }
    }

    #[test]
    fn materializes_text_rows_with_shared_columns() {
        let mut cursor = Cursor {
            columns: vec![
                ColumnMeta::new("id", TypeTag::LongLong),
                ColumnMeta::new("name", TypeTag::VarString),
            ],
            rows: vec![
                vec![Some(b"1".to_vec()), Some(b"alice".to_vec())],
                vec![Some(b"2".to_vec()), None],
            ]
            .into_iter(),
        };
        let rs = materialize(&mut cursor).unwrap();
        assert_eq!(rs.len(), 2);
        assert_eq!(rs.get_column_names(), vec!["id", "name"]);
        assert_eq!(rs.results[0].get("name"), Some(&RowValues::Text("alice".into())));
        assert_eq!(rs.results[1].get("NAME"), Some(&RowValues::Null));
        assert!(Arc::ptr_eq(&rs.results[0].columns, &rs.results[1].columns));
    }

    #[test]
    fn ragged_row_is_interface_error() {
        let columns = vec![ColumnMeta::new("a", TypeTag::Long)];
        let err = decode_row(&columns, &[None, None], RowFormat::Text).unwrap_err();
        assert!(matches!(err, SqlEngineError::InterfaceError(_)));
    }

    #[test]
    fn count_sentinel_is_internal_error() {
        assert_eq!(checked_count(3, Diagnostic::default).unwrap(), 3);
        let err = checked_count(COUNT_ERROR, Diagnostic::default).unwrap_err();
        assert!(matches!(err, SqlEngineError::InternalError(ref d) if !d.message.is_empty()));
    }
}
