use sql_stmt_engine::prelude::*;
use sql_stmt_engine::test_utils::ScriptedDriver;

mod common;

#[test]
fn test06_escape_through_connection() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    let mut conn = common::connect(&driver)?;

    let raw = "O'Reilly\n";
    let escaped = conn.escape(raw)?;
    assert_eq!(escaped, "O\\'Reilly\\n");
    assert!(escaped.len() <= 2 * raw.len() + 1);
    Ok(())
}

#[test]
fn test06_no_backslash_escapes_mode() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.escape_mode(EscapeMode::NoBackslashEscapes);
    let mut conn = common::connect(&driver)?;
    assert_eq!(conn.escape("it's a\\b")?, "it''s a\\b");
    Ok(())
}

#[test]
fn test06_escape_failure_is_internal_error() -> Result<(), Box<dyn std::error::Error>> {
    let gone = common::diag(2006, "HY000", "MySQL server has gone away");
    let driver = ScriptedDriver::new();
    driver.fail_escape(gone.clone());
    let mut conn = common::connect(&driver)?;
    let err = conn.escape("x").unwrap_err();
    assert_eq!(err.diagnostic(), Some(&gone));
    Ok(())
}

#[test]
fn test06_escape_bound_holds_for_worst_case() {
    for n in [0, 1, 7, 64] {
        let raw = "'".repeat(n);
        for mode in [EscapeMode::Backslash, EscapeMode::NoBackslashEscapes] {
            let escaped = escape_string(&raw, mode);
            assert_eq!(escaped.len(), 2 * n);
            assert!(escaped.len() <= 2 * raw.len() + 1);
        }
    }
}
