use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

use crate::binder::NativeBinding;
use crate::config::{ClientFlags, ConnectOption, ConnectParams, OptionValue};
use crate::driver::{
    COUNT_ERROR, Driver, NO_MORE_RESULTS, NativeConnection, NativeDiagnostics, NativeResultSet,
    NativeStatement, RawRow,
};
use crate::error::{Diagnostic, SqlEngineError};
use crate::escape::{EscapeMode, escape_string};
use crate::types::{ColumnMeta, RowFormat, RowValues, wire_value};

const ER_PARSE_ERROR: u32 = 1064;
const ER_BAD_DB_ERROR: u32 = 1049;
const CR_COMMANDS_OUT_OF_SYNC: u32 = 2014;
const CR_OUT_OF_MEMORY: u32 = 2008;

/// One entry of a scripted query batch.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResult {
    /// A result set, delivered in text format.
    Rows {
        columns: Vec<ColumnMeta>,
        rows: Vec<Vec<RowValues>>,
    },
    /// A statement without a result set.
    Affected(u64),
    /// A statement that declares columns but fails while its result is stored.
    Error(Diagnostic),
    /// A statement that declares columns but yields no result and no error.
    MissingResult,
    /// Advancing to this entry fails with the diagnostic.
    NextResultError(Diagnostic),
}

/// Behaviour of one prepared statement.
#[derive(Debug, Clone, Default)]
pub struct StatementScript {
    param_count: usize,
    columns: Vec<ColumnMeta>,
    rows: Vec<Vec<RowValues>>,
    affected: u64,
    insert_id: u64,
    loopback: bool,
    fail_prepare: Option<Diagnostic>,
    fail_execute: Option<Diagnostic>,
    fail_fetch_at: Option<(usize, Diagnostic)>,
}

impl StatementScript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn params(mut self, count: usize) -> Self {
        self.param_count = count;
        self
    }

    #[must_use]
    pub fn columns(mut self, columns: Vec<ColumnMeta>) -> Self {
        self.columns = columns;
        self
    }

    #[must_use]
    pub fn rows(mut self, rows: Vec<Vec<RowValues>>) -> Self {
        self.rows = rows;
        self
    }

    #[must_use]
    pub fn affected(mut self, count: u64) -> Self {
        self.affected = count;
        self
    }

    #[must_use]
    pub fn insert_id(mut self, id: u64) -> Self {
        self.insert_id = id;
        self
    }

    /// Return the bound parameter buffers, unchanged, as the only row.
    #[must_use]
    pub fn loopback(mut self) -> Self {
        self.loopback = true;
        self
    }

    #[must_use]
    pub fn fail_prepare(mut self, diag: Diagnostic) -> Self {
        self.fail_prepare = Some(diag);
        self
    }

    #[must_use]
    pub fn fail_execute(mut self, diag: Diagnostic) -> Self {
        self.fail_execute = Some(diag);
        self
    }

    /// Fail the fetch of row `index` (zero based).
    #[must_use]
    pub fn fail_fetch_at(mut self, index: usize, diag: Diagnostic) -> Self {
        self.fail_fetch_at = Some((index, diag));
        self
    }
}

#[derive(Debug, Default)]
struct Script {
    queries: HashMap<String, Result<Vec<ScriptedResult>, Diagnostic>>,
    statements: HashMap<String, StatementScript>,
    unknown_databases: HashSet<String>,
    fail_init: bool,
    fail_option: Option<(ConnectOption, Diagnostic)>,
    fail_connect: Option<Diagnostic>,
    fail_escape: Option<Diagnostic>,
    fail_stmt_init: bool,
    escape_mode: EscapeMode,
    calls: Vec<String>,
    closed_connections: usize,
    closed_statements: usize,
}

type Shared = Arc<Mutex<Script>>;

fn with_script<R>(script: &Shared, f: impl FnOnce(&mut Script) -> R) -> R {
    let mut guard = script.lock().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
}

fn record(script: &Shared, call: impl Into<String>) {
    let call = call.into();
    tracing::trace!(%call, "scripted driver call");
    with_script(script, |s| s.calls.push(call));
}

fn parse_error(sql: &str) -> Diagnostic {
    Diagnostic::new(
        ER_PARSE_ERROR,
        "42000",
        format!("You have an error in your SQL syntax near '{sql}'"),
    )
}

/// A [`Driver`] whose connections answer from a shared script.
///
/// Clones share the script, so a test can keep one handle for assertions
/// while connections created from another run.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDriver {
    script: Shared,
}

impl ScriptedDriver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `sql` with one outcome per statement.
    pub fn on_query(&self, sql: &str, results: Vec<ScriptedResult>) -> &Self {
        with_script(&self.script, |s| {
            s.queries.insert(sql.to_string(), Ok(results));
        });
        self
    }

    /// Reject `sql` outright.
    pub fn reject_query(&self, sql: &str, diag: Diagnostic) -> &Self {
        with_script(&self.script, |s| {
            s.queries.insert(sql.to_string(), Err(diag));
        });
        self
    }

    /// Accept `sql` for preparation with the given behaviour.
    pub fn on_prepare(&self, sql: &str, plan: StatementScript) -> &Self {
        with_script(&self.script, |s| {
            s.statements.insert(sql.to_string(), plan);
        });
        self
    }

    pub fn unknown_database(&self, name: &str) -> &Self {
        with_script(&self.script, |s| {
            s.unknown_databases.insert(name.to_string());
        });
        self
    }

    pub fn fail_init(&self) -> &Self {
        with_script(&self.script, |s| s.fail_init = true);
        self
    }

    pub fn fail_option(&self, option: ConnectOption, diag: Diagnostic) -> &Self {
        with_script(&self.script, |s| s.fail_option = Some((option, diag)));
        self
    }

    pub fn fail_connect(&self, diag: Diagnostic) -> &Self {
        with_script(&self.script, |s| s.fail_connect = Some(diag));
        self
    }

    pub fn fail_escape(&self, diag: Diagnostic) -> &Self {
        with_script(&self.script, |s| s.fail_escape = Some(diag));
        self
    }

    pub fn fail_stmt_init(&self) -> &Self {
        with_script(&self.script, |s| s.fail_stmt_init = true);
        self
    }

    pub fn escape_mode(&self, mode: EscapeMode) -> &Self {
        with_script(&self.script, |s| s.escape_mode = mode);
        self
    }

    /// Every native call received so far, oldest first.
    #[must_use]
    pub fn calls(&self) -> Vec<String> {
        with_script(&self.script, |s| s.calls.clone())
    }

    #[must_use]
    pub fn closed_connections(&self) -> usize {
        with_script(&self.script, |s| s.closed_connections)
    }

    #[must_use]
    pub fn closed_statements(&self) -> usize {
        with_script(&self.script, |s| s.closed_statements)
    }
}

impl Driver for ScriptedDriver {
    type Connection = ScriptedConnection;

    fn init(&self) -> Option<ScriptedConnection> {
        record(&self.script, "init");
        if with_script(&self.script, |s| s.fail_init) {
            return None;
        }
        Some(ScriptedConnection {
            script: Arc::clone(&self.script),
            flags: ClientFlags::default(),
            current: None,
            pending: VecDeque::new(),
            affected: COUNT_ERROR,
            error: None,
            closed: false,
        })
    }
}

/// Connection handle of a [`ScriptedDriver`].
#[derive(Debug)]
pub struct ScriptedConnection {
    script: Shared,
    flags: ClientFlags,
    current: Option<ScriptedResult>,
    pending: VecDeque<ScriptedResult>,
    affected: u64,
    error: Option<Diagnostic>,
    closed: bool,
}

impl ScriptedConnection {
    fn fail(&mut self, diag: Diagnostic) -> i32 {
        self.error = Some(diag);
        1
    }

    fn enter(&mut self, entry: ScriptedResult) {
        self.affected = match &entry {
            ScriptedResult::Affected(count) => *count,
            ScriptedResult::Rows { rows, .. } => rows.len() as u64,
            _ => COUNT_ERROR,
        };
        self.current = Some(entry);
        self.error = None;
    }
}

impl NativeDiagnostics for ScriptedConnection {
    fn errno(&self) -> u32 {
        self.error.as_ref().map_or(0, |d| d.code)
    }

    fn error(&self) -> String {
        self.error.as_ref().map(|d| d.message.clone()).unwrap_or_default()
    }

    fn sqlstate(&self) -> String {
        self.error
            .as_ref()
            .map_or_else(|| "00000".to_string(), |d| d.sqlstate.clone())
    }
}

impl NativeConnection for ScriptedConnection {
    type ResultSet = ScriptedResultSet;
    type Statement = ScriptedStatement;

    fn set_option(&mut self, option: ConnectOption, value: &OptionValue) -> i32 {
        record(&self.script, format!("set_option {option}"));
        let refused = with_script(&self.script, |s| match &s.fail_option {
            Some((failing, diag)) if *failing == option => Some(diag.clone()),
            _ => None,
        });
        tracing::trace!(%option, ?value, refused = refused.is_some(), "scripted option");
        match refused {
            Some(diag) => self.fail(diag),
            None => 0,
        }
    }

    fn connect(&mut self, params: &ConnectParams<'_>, flags: ClientFlags) -> i32 {
        record(&self.script, format!("connect {}@{}", params.user, params.host));
        if let Some(diag) = with_script(&self.script, |s| s.fail_connect.clone()) {
            return self.fail(diag);
        }
        self.flags = flags;
        0
    }

    fn query(&mut self, sql: &str) -> i32 {
        record(&self.script, format!("query {sql}"));
        self.current = None;
        self.pending.clear();
        let scripted = with_script(&self.script, |s| s.queries.get(sql).cloned());
        let mut entries: VecDeque<ScriptedResult> = match scripted {
            Some(Ok(entries)) => entries.into(),
            Some(Err(diag)) => return self.fail(diag),
            None => return self.fail(parse_error(sql)),
        };
        if entries.len() > 1 && !self.flags.multi_statements {
            return self.fail(parse_error(sql));
        }
        match entries.pop_front() {
            Some(first) => {
                self.pending = entries;
                self.enter(first);
            }
            None => self.enter(ScriptedResult::Affected(0)),
        }
        0
    }

    fn store_result(&mut self) -> Option<ScriptedResultSet> {
        record(&self.script, "store_result");
        match self.current.take() {
            Some(ScriptedResult::Rows { columns, rows }) => {
                let num_rows = rows.len() as u64;
                let rendered = rows
                    .iter()
                    .map(|row| row.iter().map(render_text).collect())
                    .collect::<Vec<RawRow>>();
                Some(ScriptedResultSet {
                    columns,
                    num_rows,
                    rows: rendered.into(),
                })
            }
            Some(ScriptedResult::Error(diag)) => {
                self.error = Some(diag.clone());
                self.current = Some(ScriptedResult::Error(diag));
                None
            }
            other => {
                self.current = other;
                None
            }
        }
    }

    fn field_count(&self) -> u32 {
        match &self.current {
            Some(ScriptedResult::Rows { columns, .. }) => {
                u32::try_from(columns.len()).unwrap_or(u32::MAX)
            }
            Some(ScriptedResult::Error(_) | ScriptedResult::MissingResult) => 1,
            _ => 0,
        }
    }

    fn affected_rows(&self) -> u64 {
        self.affected
    }

    fn next_result(&mut self) -> i32 {
        record(&self.script, "next_result");
        self.current = None;
        match self.pending.pop_front() {
            None => NO_MORE_RESULTS,
            Some(ScriptedResult::NextResultError(diag)) => {
                self.pending.clear();
                self.fail(diag)
            }
            Some(entry) => {
                self.enter(entry);
                0
            }
        }
    }

    fn escape(&mut self, raw: &str) -> Option<String> {
        record(&self.script, "escape");
        let (failure, mode) = with_script(&self.script, |s| (s.fail_escape.clone(), s.escape_mode));
        if let Some(diag) = failure {
            self.error = Some(diag);
            return None;
        }
        Some(escape_string(raw, mode))
    }

    fn ping(&mut self) -> i32 {
        record(&self.script, "ping");
        0
    }

    fn select_db(&mut self, database: &str) -> i32 {
        record(&self.script, format!("select_db {database}"));
        if with_script(&self.script, |s| s.unknown_databases.contains(database)) {
            return self.fail(Diagnostic::new(
                ER_BAD_DB_ERROR,
                "42000",
                format!("Unknown database '{database}'"),
            ));
        }
        0
    }

    fn autocommit(&mut self, enabled: bool) -> i32 {
        record(&self.script, format!("autocommit {enabled}"));
        0
    }

    fn commit(&mut self) -> i32 {
        record(&self.script, "commit");
        0
    }

    fn rollback(&mut self) -> i32 {
        record(&self.script, "rollback");
        0
    }

    fn stmt_init(&mut self) -> Option<ScriptedStatement> {
        record(&self.script, "stmt_init");
        if with_script(&self.script, |s| s.fail_stmt_init) {
            self.error = Some(Diagnostic::new(
                CR_OUT_OF_MEMORY,
                "HY000",
                "client library could not allocate a statement handle",
            ));
            return None;
        }
        Some(ScriptedStatement {
            script: Arc::clone(&self.script),
            plan: None,
            bound: Vec::new(),
            pending_rows: VecDeque::new(),
            current_row: Vec::new(),
            fetched: 0,
            total_rows: 0,
            executed: false,
            results_bound: false,
            error: None,
            closed: false,
        })
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        record(&self.script, "close");
        with_script(&self.script, |s| s.closed_connections += 1);
    }
}

/// Text-format result set handed out by [`ScriptedConnection::store_result`].
#[derive(Debug)]
pub struct ScriptedResultSet {
    columns: Vec<ColumnMeta>,
    num_rows: u64,
    rows: VecDeque<RawRow>,
}

impl NativeResultSet for ScriptedResultSet {
    fn num_rows(&self) -> u64 {
        self.num_rows
    }

    fn fields(&self) -> Vec<ColumnMeta> {
        self.columns.clone()
    }

    fn format(&self) -> RowFormat {
        RowFormat::Text
    }

    fn fetch_row(&mut self) -> Option<RawRow> {
        self.rows.pop_front()
    }
}

fn render_text(value: &RowValues) -> Option<Vec<u8>> {
    let text = match value {
        RowValues::Null => return None,
        RowValues::Blob(bytes) => return Some(bytes.clone()),
        RowValues::Int(i) => i.to_string(),
        RowValues::UInt(u) => u.to_string(),
        RowValues::Float(f) => f.to_string(),
        RowValues::Text(s) => s.clone(),
        RowValues::Bool(b) => u8::from(*b).to_string(),
        RowValues::Date(d) => d.format("%Y-%m-%d").to_string(),
        RowValues::Time(t) => t.format("%H:%M:%S%.f").to_string(),
        RowValues::Timestamp(ts) => ts.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
        RowValues::JSON(json) => json.to_string(),
    };
    Some(text.into_bytes())
}

fn encode_binary(columns: &[ColumnMeta], row: &[RowValues]) -> Result<RawRow, SqlEngineError> {
    columns
        .iter()
        .zip(row)
        .map(|(column, value)| {
            if value.is_null() {
                return Ok(None);
            }
            let repr = column.type_tag.native_type()?;
            wire_value(column.type_tag, repr, value).map(Some)
        })
        .collect()
}

/// Statement handle of a [`ScriptedDriver`].
///
/// Fetch reports end of data with `100`, as libmysqlclient does, and errors
/// with `1`.
#[derive(Debug)]
pub struct ScriptedStatement {
    script: Shared,
    plan: Option<StatementScript>,
    bound: RawRow,
    pending_rows: VecDeque<RawRow>,
    current_row: RawRow,
    fetched: usize,
    total_rows: u64,
    executed: bool,
    results_bound: bool,
    error: Option<Diagnostic>,
    closed: bool,
}

impl ScriptedStatement {
    fn fail(&mut self, diag: Diagnostic) -> i32 {
        self.error = Some(diag);
        1
    }

    fn out_of_sync(&mut self) -> i32 {
        self.fail(Diagnostic::new(
            CR_COMMANDS_OUT_OF_SYNC,
            "HY000",
            "Commands out of sync; you can't run this command now",
        ))
    }
}

impl NativeDiagnostics for ScriptedStatement {
    fn errno(&self) -> u32 {
        self.error.as_ref().map_or(0, |d| d.code)
    }

    fn error(&self) -> String {
        self.error.as_ref().map(|d| d.message.clone()).unwrap_or_default()
    }

    fn sqlstate(&self) -> String {
        self.error
            .as_ref()
            .map_or_else(|| "00000".to_string(), |d| d.sqlstate.clone())
    }
}

impl NativeStatement for ScriptedStatement {
    const NO_MORE_ROWS: i32 = 100;

    fn prepare(&mut self, sql: &str) -> i32 {
        record(&self.script, format!("prepare {sql}"));
        let plan = match with_script(&self.script, |s| s.statements.get(sql).cloned()) {
            Some(plan) => plan,
            None => return self.fail(parse_error(sql)),
        };
        if let Some(diag) = plan.fail_prepare.clone() {
            return self.fail(diag);
        }
        self.plan = Some(plan);
        self.error = None;
        0
    }

    fn param_count(&self) -> usize {
        self.plan.as_ref().map_or(0, |p| p.param_count)
    }

    fn result_metadata(&self) -> Vec<ColumnMeta> {
        self.plan.as_ref().map(|p| p.columns.clone()).unwrap_or_default()
    }

    fn bind_param(&mut self, bindings: &[NativeBinding<'_>]) -> i32 {
        record(&self.script, format!("bind_param {}", bindings.len()));
        self.bound = bindings
            .iter()
            .map(|b| b.as_bytes().map(<[u8]>::to_vec))
            .collect();
        0
    }

    fn execute(&mut self) -> i32 {
        record(&self.script, "execute");
        let Some(plan) = self.plan.clone() else {
            return self.out_of_sync();
        };
        if let Some(diag) = plan.fail_execute {
            return self.fail(diag);
        }
        let rows = if plan.loopback {
            vec![self.bound.clone()]
        } else {
            let encoded: Result<Vec<RawRow>, SqlEngineError> = plan
                .rows
                .iter()
                .map(|row| encode_binary(&plan.columns, row))
                .collect();
            match encoded {
                Ok(rows) => rows,
                Err(err) => return self.fail(Diagnostic::new(1210, "HY000", err.to_string())),
            }
        };
        self.total_rows = rows.len() as u64;
        self.pending_rows = rows.into();
        self.current_row.clear();
        self.fetched = 0;
        self.executed = true;
        self.error = None;
        0
    }

    fn bind_result(&mut self, columns: &[ColumnMeta]) -> i32 {
        record(&self.script, format!("bind_result {}", columns.len()));
        self.results_bound = true;
        0
    }

    fn fetch(&mut self) -> i32 {
        record(&self.script, "fetch");
        if !self.executed || !self.results_bound {
            return self.out_of_sync();
        }
        let failing = self
            .plan
            .as_ref()
            .and_then(|p| p.fail_fetch_at.clone())
            .filter(|(index, _)| *index == self.fetched);
        if let Some((_, diag)) = failing {
            return self.fail(diag);
        }
        match self.pending_rows.pop_front() {
            Some(row) => {
                self.current_row = row;
                self.fetched += 1;
                0
            }
            None => Self::NO_MORE_ROWS,
        }
    }

    fn row_buffers(&self) -> &[Option<Vec<u8>>] {
        &self.current_row
    }

    fn affected_rows(&self) -> u64 {
        match &self.plan {
            Some(plan) if self.executed => plan.affected,
            _ => COUNT_ERROR,
        }
    }

    fn num_rows(&self) -> u64 {
        self.total_rows
    }

    fn insert_id(&self) -> u64 {
        self.plan.as_ref().map_or(0, |p| p.insert_id)
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        record(&self.script, "stmt_close");
        with_script(&self.script, |s| s.closed_statements += 1);
    }
}
