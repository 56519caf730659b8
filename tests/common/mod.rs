#![allow(dead_code)]

use sql_stmt_engine::prelude::*;
use sql_stmt_engine::test_utils::{ScriptedConnection, ScriptedDriver};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}

pub fn connect(driver: &ScriptedDriver) -> Result<Connection<ScriptedConnection>, SqlEngineError> {
    init_tracing();
    ConnectConfig::builder("localhost", "app")
        .database("app_db")
        .connect(driver)
}

pub fn connect_multi(
    driver: &ScriptedDriver,
) -> Result<Connection<ScriptedConnection>, SqlEngineError> {
    init_tracing();
    ConnectConfig::builder("localhost", "app")
        .database("app_db")
        .multi_statements(true)
        .connect(driver)
}

pub fn diag(code: u32, sqlstate: &str, message: &str) -> Diagnostic {
    Diagnostic::new(code, sqlstate, message)
}
