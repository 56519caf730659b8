use sql_stmt_engine::driver::COUNT_ERROR;
use sql_stmt_engine::prelude::*;
use sql_stmt_engine::test_utils::{ScriptedDriver, ScriptedResult};

mod common;

const BATCH: &str = "SELECT 1; UPDATE t SET x=1; SELECT 2";

fn constant(name: &str, value: i64) -> ScriptedResult {
    ScriptedResult::Rows {
        columns: vec![ColumnMeta::new(name, TypeTag::LongLong)],
        rows: vec![vec![RowValues::Int(value)]],
    }
}

#[test]
fn test04_batch_outcomes_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query(
        BATCH,
        vec![constant("1", 1), ScriptedResult::Affected(4), constant("2", 2)],
    );
    let mut conn = common::connect_multi(&driver)?;

    let batch = conn.execute_batch(BATCH)?;
    assert_eq!(batch.len(), 3);
    let first = batch.get(0).and_then(QueryOutcome::as_rows).ok_or("entry 0 should hold rows")?;
    assert_eq!(first.results[0].get("1"), Some(&RowValues::Int(1)));
    assert_eq!(batch.get(1).and_then(QueryOutcome::affected), Some(4));
    let third = batch.get(2).and_then(QueryOutcome::as_rows).ok_or("entry 2 should hold rows")?;
    assert_eq!(third.results[0].get_by_index(0), Some(&RowValues::Int(2)));

    match conn.query(BATCH)? {
        QueryResult::Multiple(outcomes) => assert_eq!(outcomes.len(), 3),
        QueryResult::Single(_) => panic!("three statements should not unwrap"),
    }
    Ok(())
}

#[test]
fn test04_single_statement_unwraps() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query("SELECT 1", vec![constant("1", 1)]);
    let mut conn = common::connect(&driver)?;

    let result = conn.query("SELECT 1")?;
    let rows = result
        .single()
        .and_then(QueryOutcome::as_rows)
        .ok_or("expected a bare result set")?;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows.values(), vec![vec![RowValues::Int(1)]]);

    let batch = conn.execute_batch("SELECT 1")?;
    assert_eq!(batch.len(), 1);
    Ok(())
}

#[test]
fn test04_batch_requires_multi_statements() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query(
        BATCH,
        vec![constant("1", 1), ScriptedResult::Affected(4), constant("2", 2)],
    );
    let mut conn = common::connect(&driver)?;
    let err = conn.execute_batch(BATCH).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.diagnostic().map(|d| d.code), Some(1064));
    Ok(())
}

#[test]
fn test04_next_result_statuses() -> Result<(), Box<dyn std::error::Error>> {
    let lost = common::diag(2013, "HY000", "Lost connection to MySQL server during query");
    let driver = ScriptedDriver::new();
    driver.on_query(
        "UPDATE a SET x=1; UPDATE b SET x=1",
        vec![
            ScriptedResult::Affected(1),
            ScriptedResult::NextResultError(lost.clone()),
        ],
    );
    driver.on_query(
        "UPDATE a SET x=1; UPDATE c SET x=1",
        vec![ScriptedResult::Affected(1), ScriptedResult::Affected(0)],
    );
    let mut conn = common::connect_multi(&driver)?;

    let err = conn.execute_batch("UPDATE a SET x=1; UPDATE b SET x=1").unwrap_err();
    assert!(matches!(err, SqlEngineError::InternalError(ref d) if *d == lost));

    let batch = conn.execute_batch("UPDATE a SET x=1; UPDATE c SET x=1")?;
    let counts: Vec<_> = batch.iter().filter_map(QueryOutcome::affected).collect();
    assert_eq!(counts, vec![1, 0]);
    Ok(())
}

#[test]
fn test04_failed_entry_aborts_and_drains() -> Result<(), Box<dyn std::error::Error>> {
    let deadlock = common::diag(1213, "40001", "Deadlock found when trying to get lock");
    let sql = "SELECT 1; SELECT * FROM locked; UPDATE t SET x=2";
    let driver = ScriptedDriver::new();
    driver.on_query(
        sql,
        vec![
            constant("1", 1),
            ScriptedResult::Error(deadlock.clone()),
            ScriptedResult::Affected(2),
        ],
    );
    driver.on_query("SELECT 2", vec![constant("2", 2)]);
    let mut conn = common::connect_multi(&driver)?;

    let err = conn.execute_batch(sql).unwrap_err();
    assert_eq!(err.diagnostic(), Some(&deadlock));

    // the pending UPDATE result was consumed so the connection stays usable
    let calls = driver.calls();
    let after_query = calls
        .iter()
        .skip_while(|c| !c.starts_with("query SELECT 1;"))
        .filter(|c| *c == "next_result")
        .count();
    assert_eq!(after_query, 3);
    assert!(conn.query("SELECT 2")?.single().is_some());
    Ok(())
}

#[test]
fn test04_missing_result_is_interface_error() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query("SHOW WARNINGS", vec![ScriptedResult::MissingResult]);
    let mut conn = common::connect(&driver)?;
    let err = conn.query("SHOW WARNINGS").unwrap_err();
    assert!(matches!(err, SqlEngineError::InterfaceError(ref msg) if msg.contains("did not")));
    Ok(())
}

#[test]
fn test04_count_sentinel_is_internal_error() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query("UPDATE t SET x=1", vec![ScriptedResult::Affected(COUNT_ERROR)]);
    let mut conn = common::connect(&driver)?;
    let err = conn.query("UPDATE t SET x=1").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(matches!(conn.affected_rows(), Err(SqlEngineError::InternalError(_))));
    Ok(())
}

#[test]
fn test04_rejected_query() -> Result<(), Box<dyn std::error::Error>> {
    let denied = common::diag(1142, "42000", "UPDATE command denied to user 'app'");
    let driver = ScriptedDriver::new();
    driver.reject_query("UPDATE secrets SET x=1", denied.clone());
    let mut conn = common::connect(&driver)?;
    let err = conn.query("UPDATE secrets SET x=1").unwrap_err();
    assert_eq!(err.diagnostic(), Some(&denied));
    assert_eq!(err.to_string(), format!("Internal error {denied}"));
    Ok(())
}

#[test]
fn test04_affected_rows_after_query() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query("DELETE FROM t", vec![ScriptedResult::Affected(7)]);
    let mut conn = common::connect(&driver)?;
    let outcome = conn.query("DELETE FROM t")?;
    assert_eq!(outcome.single().and_then(QueryOutcome::affected), Some(7));
    assert_eq!(conn.affected_rows()?, 7);
    Ok(())
}

#[test]
fn test04_rows_outcome_carries_no_affected_count() -> Result<(), Box<dyn std::error::Error>> {
    let driver = ScriptedDriver::new();
    driver.on_query(
        "SELECT n FROM t",
        vec![ScriptedResult::Rows {
            columns: vec![ColumnMeta::new("n", TypeTag::Long)],
            rows: vec![vec![RowValues::Int(1)], vec![RowValues::Int(2)], vec![RowValues::Int(3)]],
        }],
    );
    let mut conn = common::connect(&driver)?;
    let result = conn.query("SELECT n FROM t")?;
    let outcome = result.single().ok_or("expected one outcome")?;
    assert_eq!(outcome.affected(), None);
    assert_eq!(outcome.as_rows().map(ResultSet::len), Some(3));
    Ok(())
}
