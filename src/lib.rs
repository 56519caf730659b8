//! Prepared-statement execution and result binding for row-oriented SQL
//! clients speaking the MySQL client ABI.
//!
//! The engine sits between typed application values and a native driver:
//!
//! - [`binder`] converts [`RowValues`] into positional native bindings,
//! - [`Statement`] drives the prepare / bind / execute / fetch lifecycle,
//! - [`executor`] runs plain and multi-statement queries,
//! - [`results`] materializes native rows into [`ResultSet`]s,
//! - [`Connection`] owns the native handle and its statement slot.
//!
//! Drivers plug in through the traits in [`driver`].
//!
//! ```rust
//! use sql_stmt_engine::prelude::*;
//! use sql_stmt_engine::test_utils::{ScriptedDriver, ScriptedResult};
//!
//! let driver = ScriptedDriver::new();
//! driver.on_query("UPDATE t SET x = 1", vec![ScriptedResult::Affected(3)]);
//!
//! let mut conn = ConnectConfig::builder("localhost", "app").connect(&driver)?;
//! let outcome = conn.query("UPDATE t SET x = 1")?;
//! assert_eq!(outcome.single().and_then(QueryOutcome::affected), Some(3));
//! # Ok::<(), SqlEngineError>(())
//! ```

pub mod binder;
pub mod config;
pub mod connection;
pub mod driver;
pub mod error;
pub mod escape;
pub mod executor;
pub mod prelude;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use binder::{BindBuffer, NativeBinding, bind};
pub use config::{ClientFlags, ConnectConfig, ConnectConfigBuilder, ConnectOption, OptionValue};
pub use connection::Connection;
pub use error::{Diagnostic, ErrorKind, SqlEngineError};
pub use executor::{BatchOutcome, QueryOutcome, QueryResult};
pub use results::{CustomDbRow, ResultSet};
pub use statement::{Rows, Statement, StatementState};
pub use types::{ColumnMeta, RowValues, TypeTag};
