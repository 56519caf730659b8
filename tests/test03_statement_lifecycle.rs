use chrono::NaiveDate;
use sql_stmt_engine::prelude::*;
use sql_stmt_engine::test_utils::{ScriptedDriver, StatementScript};

mod common;

const USERS_SQL: &str = "SELECT id, name FROM users WHERE id > ?";

fn users_driver() -> ScriptedDriver {
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        USERS_SQL,
        StatementScript::new()
            .params(1)
            .columns(vec![
                ColumnMeta::new("id", TypeTag::LongLong).not_null(),
                ColumnMeta::new("name", TypeTag::VarString),
            ])
            .rows(vec![
                vec![RowValues::Int(1), RowValues::Text("alice".into())],
                vec![RowValues::Int(2), RowValues::Null],
            ]),
    );
    driver
}

#[test]
fn test03_prepare_bind_execute_fetch() -> Result<(), Box<dyn std::error::Error>> {
    let driver = users_driver();
    let mut conn = common::connect(&driver)?;

    let stmt = conn.prepare(USERS_SQL)?;
    assert_eq!(stmt.state(), StatementState::Prepared);
    assert_eq!(stmt.param_count(), 1);
    assert_eq!(stmt.sql(), Some(USERS_SQL));

    stmt.bind_values(&[TypeTag::LongLong], &[RowValues::Int(0)])?;
    assert_eq!(stmt.state(), StatementState::Bound);

    stmt.execute()?;
    assert_eq!(stmt.state(), StatementState::Executed);
    assert_eq!(stmt.num_rows()?, 2);

    let rs = stmt.fetch_all()?;
    assert_eq!(stmt.state(), StatementState::Fetchable);
    assert_eq!(rs.len(), 2);
    assert_eq!(rs.get_column_names(), vec!["id", "name"]);
    assert_eq!(rs.results[0].get("name"), Some(&RowValues::Text("alice".into())));
    assert_eq!(rs.results[1].get("id"), Some(&RowValues::Int(2)));
    assert_eq!(rs.results[1].get("name"), Some(&RowValues::Null));

    // re-execution with new bindings restarts the cursor
    stmt.execute_with(&[RowValues::Int(1)])?;
    assert_eq!(stmt.rows().count(), 2);
    assert!(stmt.fetch()?.is_none());
    Ok(())
}

#[test]
fn test03_out_of_order_calls_are_interface_errors() -> Result<(), Box<dyn std::error::Error>> {
    let driver = users_driver();
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare(USERS_SQL)?;

    let calls = driver.calls().len();
    assert!(matches!(stmt.execute(), Err(SqlEngineError::InterfaceError(_))));
    assert!(matches!(stmt.fetch(), Err(SqlEngineError::InterfaceError(_))));
    assert!(matches!(stmt.affected_rows(), Err(SqlEngineError::InterfaceError(_))));
    assert!(matches!(stmt.prepare(USERS_SQL), Err(SqlEngineError::InterfaceError(_))));
    assert_eq!(driver.calls().len(), calls);
    Ok(())
}

#[test]
fn test03_parameter_count_mismatch() -> Result<(), Box<dyn std::error::Error>> {
    let driver = users_driver();
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare(USERS_SQL)?;

    let err = stmt
        .bind_values(&[TypeTag::Long, TypeTag::Long], &[RowValues::Int(1), RowValues::Int(2)])
        .unwrap_err();
    assert!(matches!(err, SqlEngineError::InterfaceError(ref msg) if msg.contains("length mismatch")));

    let err = stmt.bind_values(&[TypeTag::Long], &[]).unwrap_err();
    assert!(matches!(err, SqlEngineError::InterfaceError(_)));
    assert_eq!(stmt.state(), StatementState::Prepared);
    assert!(!driver.calls().iter().any(|c| c.starts_with("bind_param")));
    Ok(())
}

#[test]
fn test03_temporal_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "SELECT ?",
        StatementScript::new()
            .params(1)
            .columns(vec![ColumnMeta::new("ts", TypeTag::DateTime)])
            .loopback(),
    );
    let mut conn = common::connect(&driver)?;
    let stamp = NaiveDate::from_ymd_opt(2024, 1, 15)
        .and_then(|d| d.and_hms_opt(10, 30, 0))
        .ok_or("bad timestamp")?;

    let stmt = conn.prepare("SELECT ?")?;
    stmt.execute_with(&[RowValues::Timestamp(stamp)])?;
    let row = stmt.fetch()?.ok_or("expected one row")?;
    assert_eq!(row.get("ts"), Some(&RowValues::Timestamp(stamp)));
    assert_eq!(row.get("ts").and_then(RowValues::as_timestamp), Some(stamp));
    assert!(stmt.fetch()?.is_none());
    Ok(())
}

#[test]
fn test03_null_parameter_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "SELECT ?, ?",
        StatementScript::new()
            .params(2)
            .columns(vec![
                ColumnMeta::new("a", TypeTag::VarString),
                ColumnMeta::new("b", TypeTag::Long),
            ])
            .loopback(),
    );
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare("SELECT ?, ?")?;
    stmt.bind_values(
        &[TypeTag::VarString, TypeTag::Long],
        &[RowValues::from(None::<String>), RowValues::Int(-7)],
    )?;
    stmt.execute()?;
    let row = stmt.fetch()?.ok_or("expected one row")?;
    assert_eq!(row.into_values(), vec![RowValues::Null, RowValues::Int(-7)]);
    Ok(())
}

#[test]
fn test03_fetch_error_is_not_end_of_data() -> Result<(), Box<dyn std::error::Error>> {
    let interrupted = common::diag(1317, "70100", "Query execution was interrupted");
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "SELECT n FROM t",
        StatementScript::new()
            .columns(vec![ColumnMeta::new("n", TypeTag::Long)])
            .rows(vec![
                vec![RowValues::Int(1)],
                vec![RowValues::Int(2)],
                vec![RowValues::Int(3)],
            ])
            .fail_fetch_at(1, interrupted.clone()),
    );
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare("SELECT n FROM t")?;
    stmt.execute()?;

    let fetched: Vec<_> = stmt.rows().collect();
    assert_eq!(fetched.len(), 2);
    assert!(fetched[0].is_ok());
    match &fetched[1] {
        Err(SqlEngineError::StatementError(diag)) => assert_eq!(diag, &interrupted),
        other => panic!("unexpected fetch result: {other:?}"),
    }
    assert_eq!(stmt.last_error(), Some(&interrupted));
    Ok(())
}

#[test]
fn test03_prepare_failure_keeps_diagnostic() -> Result<(), Box<dyn std::error::Error>> {
    let missing = common::diag(1146, "42S02", "Table 'app_db.missing' doesn't exist");
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "SELECT * FROM missing",
        StatementScript::new().fail_prepare(missing.clone()),
    );
    let mut conn = common::connect(&driver)?;

    let err = conn.prepare("SELECT * FROM missing").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Statement);
    assert_eq!(err.diagnostic(), Some(&missing));

    let stmt = conn.statement()?;
    assert_eq!(stmt.last_error(), Some(&missing));
    assert_eq!(stmt.state(), StatementState::Uninitialized);
    assert!(matches!(stmt.execute(), Err(SqlEngineError::InterfaceError(_))));
    assert!(!driver.calls().iter().any(|c| c == "execute"));

    let err = conn.prepare("SELEC oops").unwrap_err();
    assert_eq!(err.diagnostic().map(|d| d.code), Some(1064));
    Ok(())
}

#[test]
fn test03_closed_statement_never_reaches_driver() -> Result<(), Box<dyn std::error::Error>> {
    let driver = users_driver();
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare(USERS_SQL)?;
    stmt.close();
    stmt.close();
    assert!(stmt.is_closed());
    assert_eq!(stmt.state(), StatementState::Closed);
    assert_eq!(driver.closed_statements(), 1);

    let calls = driver.calls().len();
    for err in [
        stmt.prepare(USERS_SQL).unwrap_err(),
        stmt.execute().unwrap_err(),
        stmt.bind_values(&[TypeTag::Long], &[RowValues::Int(1)]).unwrap_err(),
        stmt.fetch().unwrap_err(),
        stmt.insert_id().unwrap_err(),
    ] {
        match err {
            SqlEngineError::InterfaceError(msg) => assert!(msg.contains("null statement handle")),
            other => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(driver.calls().len(), calls);
    Ok(())
}

#[test]
fn test03_statement_counts() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "INSERT INTO t (x) VALUES (?)",
        StatementScript::new().params(1).affected(1).insert_id(41),
    );
    driver.on_prepare("DELETE FROM t", StatementScript::new().affected(5));
    let mut conn = common::connect(&driver)?;

    let stmt = conn.prepare("INSERT INTO t (x) VALUES (?)")?;
    stmt.execute_with(&[RowValues::Int(9)])?;
    assert_eq!(stmt.affected_rows()?, 1);
    assert_eq!(stmt.insert_id()?, 41);
    assert!(matches!(stmt.fetch(), Err(SqlEngineError::InterfaceError(_))));

    let stmt = conn.prepare("DELETE FROM t")?;
    stmt.execute()?;
    assert_eq!(stmt.affected_rows()?, 5);
    assert_eq!(driver.closed_statements(), 1);
    Ok(())
}

#[test]
fn test03_execute_failure_is_statement_error() -> Result<(), Box<dyn std::error::Error>> {
    let dup = common::diag(1062, "23000", "Duplicate entry '1' for key 'PRIMARY'");
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "INSERT INTO t (id) VALUES (?)",
        StatementScript::new().params(1).fail_execute(dup.clone()),
    );
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare("INSERT INTO t (id) VALUES (?)")?;
    let err = stmt.execute_with(&[RowValues::Int(1)]).unwrap_err();
    assert_eq!(err.diagnostic(), Some(&dup));
    assert_eq!(stmt.state(), StatementState::Bound);
    Ok(())
}

#[test]
fn test03_statement_handle_allocation_failure() -> Result<(), Box<dyn std::error::Error>> {
    let driver = users_driver();
    driver.fail_stmt_init();
    let mut conn = common::connect(&driver)?;
    let err = conn.prepare(USERS_SQL).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(conn.statement(), Err(SqlEngineError::InterfaceError(_))));
    Ok(())
}

#[test]
fn test03_tiny_integers_round_trip_by_signedness() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_prepare(
        "SELECT ?, ?",
        StatementScript::new()
            .params(2)
            .columns(vec![
                ColumnMeta::new("u", TypeTag::Tiny).unsigned(),
                ColumnMeta::new("s", TypeTag::Tiny),
            ])
            .loopback(),
    );
    let mut conn = common::connect(&driver)?;
    let stmt = conn.prepare("SELECT ?, ?")?;

    let err = stmt
        .bind_values(&[TypeTag::Tiny, TypeTag::Tiny], &[RowValues::Int(200), RowValues::Int(1)])
        .unwrap_err();
    assert!(matches!(err, SqlEngineError::TypeMappingError(_)));
    assert_eq!(stmt.state(), StatementState::Prepared);
    assert!(!driver.calls().iter().any(|c| c.starts_with("bind_param")));

    stmt.bind_values(
        &[TypeTag::Tiny, TypeTag::Tiny],
        &[RowValues::UInt(200), RowValues::Int(-56)],
    )?;
    stmt.execute()?;
    let row = stmt.fetch()?.ok_or("expected one row")?;
    assert_eq!(row.into_values(), vec![RowValues::UInt(200), RowValues::Int(-56)]);
    Ok(())
}
