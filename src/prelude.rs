//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::binder::{NativeBinding, bind};
pub use crate::config::{ClientFlags, ConnectConfig, ConnectOption, OptionValue};
pub use crate::connection::Connection;
pub use crate::driver::{Driver, NativeConnection, NativeStatement};
pub use crate::error::{Diagnostic, ErrorKind, SqlEngineError};
pub use crate::escape::{EscapeMode, escape_string};
pub use crate::executor::{BatchOutcome, QueryOutcome, QueryResult};
pub use crate::results::{CustomDbRow, ResultSet};
pub use crate::statement::{Statement, StatementState};
pub use crate::types::{ColumnMeta, Representation, RowValues, TypeTag};
