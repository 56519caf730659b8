//! In-memory driver and helpers for exercising the engine without a server.
//!
//! [`ScriptedDriver`] answers queries and prepared statements from a script
//! set up by the test, records every native call it receives and counts the
//! handles it releases.

mod scripted;
pub mod test_helpers;

pub use scripted::{
    ScriptedConnection, ScriptedDriver, ScriptedResult, ScriptedResultSet, ScriptedStatement,
    StatementScript,
};
pub use test_helpers::create_test_row;
