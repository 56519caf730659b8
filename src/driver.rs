//! Native driver interface.
//!
//! The engine never speaks the wire protocol itself. A driver exposes the
//! client library's primitives through these traits, one method per native
//! entry point, and the engine layers state checks and error translation on
//! top. Status codes follow the C client convention: `0` is success, anything
//! else is a failure whose details are read back through `errno`/`error`/
//! `sqlstate`.

use crate::binder::NativeBinding;
use crate::config::{ClientFlags, ConnectOption, ConnectParams, OptionValue};
use crate::error::Diagnostic;
use crate::types::{ColumnMeta, RowFormat};

/// Sentinel returned by count APIs when the count could not be obtained.
pub const COUNT_ERROR: u64 = u64::MAX;

/// Status returned by `next_result` when the batch has no more results.
pub const NO_MORE_RESULTS: i32 = -1;

/// One raw row: a buffer per column, `None` for SQL NULL.
pub type RawRow = Vec<Option<Vec<u8>>>;

/// Entry point of a driver.
pub trait Driver {
    type Connection: NativeConnection;

    /// Allocate an unconnected handle. `None` means the client library could
    /// not allocate one.
    fn init(&self) -> Option<Self::Connection>;
}

/// Diagnostics shared by connection and statement handles.
pub trait NativeDiagnostics {
    fn errno(&self) -> u32;
    fn error(&self) -> String;
    fn sqlstate(&self) -> String;

    fn diagnostic(&self) -> Diagnostic {
        Diagnostic::new(self.errno(), self.sqlstate(), self.error())
    }
}

/// A native connection handle.
pub trait NativeConnection: NativeDiagnostics {
    type ResultSet: NativeResultSet;
    type Statement: NativeStatement;

    /// Apply one option before `connect`.
    fn set_option(&mut self, option: ConnectOption, value: &OptionValue) -> i32;
    fn connect(&mut self, params: &ConnectParams<'_>, flags: ClientFlags) -> i32;
    fn query(&mut self, sql: &str) -> i32;
    /// Buffer the current result. `None` when the statement produced no
    /// result set or on error.
    fn store_result(&mut self) -> Option<Self::ResultSet>;
    fn field_count(&self) -> u32;
    fn affected_rows(&self) -> u64;
    /// `0` when another result follows, [`NO_MORE_RESULTS`] at the end of a
    /// batch, positive on error.
    fn next_result(&mut self) -> i32;
    /// Escape `raw` for use inside a quoted literal. `None` on failure.
    fn escape(&mut self, raw: &str) -> Option<String>;
    fn ping(&mut self) -> i32;
    fn select_db(&mut self, database: &str) -> i32;
    fn autocommit(&mut self, enabled: bool) -> i32;
    fn commit(&mut self) -> i32;
    fn rollback(&mut self) -> i32;
    /// Allocate a statement handle bound to this connection.
    fn stmt_init(&mut self) -> Option<Self::Statement>;
    /// Release the native connection. Must tolerate repeated calls.
    fn close(&mut self);
}

/// A buffered result set produced by a plain query.
pub trait NativeResultSet {
    fn num_rows(&self) -> u64;
    fn fields(&self) -> Vec<ColumnMeta>;
    fn format(&self) -> RowFormat {
        RowFormat::Text
    }
    fn fetch_row(&mut self) -> Option<RawRow>;
}

/// A native prepared-statement handle.
pub trait NativeStatement: NativeDiagnostics {
    /// Fetch status meaning "no more rows". Drivers whose client library uses
    /// a different code override it.
    const NO_MORE_ROWS: i32 = 1;

    fn prepare(&mut self, sql: &str) -> i32;
    fn param_count(&self) -> usize;
    /// Result column metadata; empty for statements that return no rows.
    fn result_metadata(&self) -> Vec<ColumnMeta>;
    fn bind_param(&mut self, bindings: &[NativeBinding<'_>]) -> i32;
    fn execute(&mut self) -> i32;
    /// Register output buffers for the given columns before fetching.
    fn bind_result(&mut self, columns: &[ColumnMeta]) -> i32;
    fn fetch(&mut self) -> i32;
    /// Buffers filled by the last successful `fetch`.
    fn row_buffers(&self) -> &[Option<Vec<u8>>];
    fn affected_rows(&self) -> u64;
    fn num_rows(&self) -> u64;
    fn insert_id(&self) -> u64;
    /// Release the native statement. Must tolerate repeated calls.
    fn close(&mut self);
}
