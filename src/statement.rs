use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::binder::{NativeBinding, bind};
use crate::driver::NativeStatement;
use crate::error::{Diagnostic, SqlEngineError};
use crate::results::{CustomDbRow, ResultSet, checked_count, decode_row};
use crate::types::{ColumnMeta, RowFormat, RowValues, TypeTag};

/// Lifecycle position of a [`Statement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementState {
    Uninitialized,
    Prepared,
    Bound,
    Executed,
    Fetchable,
    Closed,
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A prepared statement occupying its connection's statement slot.
///
/// The native handle is released by [`Statement::close`] (or on drop); every
/// other operation on a released handle fails with an interface error before
/// reaching the driver.
pub struct Statement<S: NativeStatement> {
    native: Option<S>,
    state: StatementState,
    sql: Option<String>,
    param_count: usize,
    columns: Option<Arc<Vec<ColumnMeta>>>,
    column_index_cache: Arc<HashMap<String, usize>>,
    last_error: Option<Diagnostic>,
}

impl<S: NativeStatement> Statement<S> {
    pub(crate) fn new(native: S) -> Self {
        Self {
            native: Some(native),
            state: StatementState::Uninitialized,
            sql: None,
            param_count: 0,
            columns: None,
            column_index_cache: Arc::default(),
            last_error: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> StatementState {
        self.state
    }

    #[must_use]
    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Number of `?` placeholders the driver reported at prepare time.
    #[must_use]
    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// Result column metadata, `None` for statements that return no rows.
    #[must_use]
    pub fn columns(&self) -> Option<&Arc<Vec<ColumnMeta>>> {
        self.columns.as_ref()
    }

    /// Diagnostic from the last failed driver call, kept for inspection.
    #[must_use]
    pub fn last_error(&self) -> Option<&Diagnostic> {
        self.last_error.as_ref()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.native.is_none()
    }

    fn native_mut(&mut self, op: &str) -> Result<&mut S, SqlEngineError> {
        self.native
            .as_mut()
            .ok_or_else(|| SqlEngineError::interface(format!("{op} called on null statement handle")))
    }

    fn native_ref(&self, op: &str) -> Result<&S, SqlEngineError> {
        self.native
            .as_ref()
            .ok_or_else(|| SqlEngineError::interface(format!("{op} called on null statement handle")))
    }

    fn require(&self, op: &str, allowed: &[StatementState]) -> Result<(), SqlEngineError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(SqlEngineError::interface(format!(
                "{op} not allowed in state {}",
                self.state
            )))
        }
    }

    fn fail(&mut self, diag: Diagnostic) -> SqlEngineError {
        tracing::debug!(code = diag.code, sqlstate = %diag.sqlstate, message = %diag.message, "statement call failed");
        self.last_error = Some(diag.clone());
        SqlEngineError::StatementError(diag)
    }

    /// Parse `sql` on the server.
    ///
    /// A handle is prepared once. New SQL goes through
    /// [`Connection::prepare`](crate::Connection::prepare), which closes this
    /// statement and allocates a fresh handle.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a released handle or when
    /// the statement was already prepared, and `SqlEngineError::StatementError`
    /// when the driver rejects the SQL. After a rejected prepare the handle
    /// keeps its diagnostic in [`Statement::last_error`] and cannot execute.
    pub fn prepare(&mut self, sql: &str) -> Result<(), SqlEngineError> {
        self.native_ref("prepare")?;
        self.require("prepare", &[StatementState::Uninitialized])?;

        let native = self.native_mut("prepare")?;
        if native.prepare(sql) != 0 {
            let diag = native.diagnostic();
            self.state = StatementState::Uninitialized;
            return Err(self.fail(diag));
        }
        let param_count = native.param_count();
        let columns = native.result_metadata();

        self.param_count = param_count;
        if columns.is_empty() {
            self.columns = None;
            self.column_index_cache = Arc::default();
        } else {
            self.column_index_cache = Arc::new(crate::results::index_columns(&columns));
            self.columns = Some(Arc::new(columns));
        }
        self.sql = Some(sql.to_string());
        self.last_error = None;
        self.state = StatementState::Prepared;
        tracing::debug!(sql, param_count, "prepared statement");
        Ok(())
    }

    /// Attach positional bindings produced by [`bind`].
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a released or unprepared
    /// handle or when the binding count differs from the declared parameter
    /// count, and `SqlEngineError::StatementError` when the driver rejects the
    /// bindings.
    pub fn bind_params(&mut self, bindings: &[NativeBinding<'_>]) -> Result<(), SqlEngineError> {
        self.native_ref("bind_params")?;
        self.require(
            "bind_params",
            &[
                StatementState::Prepared,
                StatementState::Bound,
                StatementState::Executed,
                StatementState::Fetchable,
            ],
        )?;
        if bindings.len() != self.param_count {
            return Err(SqlEngineError::interface(format!(
                "length mismatch: statement declares {} parameters, {} bound",
                self.param_count,
                bindings.len()
            )));
        }

        let native = self.native_mut("bind_params")?;
        if native.bind_param(bindings) != 0 {
            let diag = native.diagnostic();
            return Err(self.fail(diag));
        }
        self.state = StatementState::Bound;
        Ok(())
    }

    /// Run the binder over `(types, values)` and bind the result.
    ///
    /// # Errors
    ///
    /// See [`bind`] and [`Statement::bind_params`].
    pub fn bind_values(
        &mut self,
        param_types: &[TypeTag],
        values: &[RowValues],
    ) -> Result<(), SqlEngineError> {
        // Handle and state are checked before any buffers are built.
        self.native_ref("bind_values")?;
        self.require(
            "bind_values",
            &[
                StatementState::Prepared,
                StatementState::Bound,
                StatementState::Executed,
                StatementState::Fetchable,
            ],
        )?;
        let bindings = bind(param_types, values)?;
        self.bind_params(&bindings)
    }

    /// Execute the prepared (and, if it has parameters, bound) statement.
    ///
    /// For statements returning rows the result buffers are registered so
    /// that [`Statement::fetch`] can follow.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a released handle, out of
    /// order, or when parameters are declared but unbound, and
    /// `SqlEngineError::StatementError` when the driver fails.
    pub fn execute(&mut self) -> Result<(), SqlEngineError> {
        self.native_ref("execute")?;
        self.require(
            "execute",
            &[
                StatementState::Prepared,
                StatementState::Bound,
                StatementState::Executed,
                StatementState::Fetchable,
            ],
        )?;
        if self.state == StatementState::Prepared && self.param_count > 0 {
            return Err(SqlEngineError::interface(format!(
                "execute called before binding {} parameters",
                self.param_count
            )));
        }

        let columns = self.columns.clone();
        let native = self.native_mut("execute")?;
        if native.execute() != 0 {
            let diag = native.diagnostic();
            return Err(self.fail(diag));
        }
        if let Some(columns) = columns {
            if native.bind_result(&columns) != 0 {
                let diag = native.diagnostic();
                return Err(self.fail(diag));
            }
        }
        self.state = StatementState::Executed;
        tracing::debug!(sql = self.sql.as_deref().unwrap_or_default(), "executed statement");
        Ok(())
    }

    /// Bind `values` (types inferred from the values) and execute.
    ///
    /// # Errors
    ///
    /// See [`Statement::bind_values`] and [`Statement::execute`].
    pub fn execute_with(&mut self, values: &[RowValues]) -> Result<(), SqlEngineError> {
        if self.param_count > 0 || !values.is_empty() {
            let types: Vec<TypeTag> = values.iter().map(RowValues::type_tag).collect();
            self.bind_values(&types, values)?;
        }
        self.execute()
    }

    /// Fetch the next row, or `None` once the driver signals no more rows.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a released handle, before
    /// execution, or for statements without a result set, and
    /// `SqlEngineError::StatementError` for any driver fetch failure other
    /// than the end-of-data status.
    pub fn fetch(&mut self) -> Result<Option<CustomDbRow>, SqlEngineError> {
        self.native_ref("fetch")?;
        self.require("fetch", &[StatementState::Executed, StatementState::Fetchable])?;
        let columns = self.columns.clone().ok_or_else(|| {
            SqlEngineError::interface("fetch called on a statement that returns no rows")
        })?;

        let native = self.native_mut("fetch")?;
        let status = native.fetch();
        if status == S::NO_MORE_ROWS {
            self.state = StatementState::Fetchable;
            return Ok(None);
        }
        if status != 0 {
            let diag = native.diagnostic();
            return Err(self.fail(diag));
        }
        let values = decode_row(&columns, native.row_buffers(), RowFormat::Binary)?;
        self.state = StatementState::Fetchable;
        Ok(Some(CustomDbRow::with_cache(
            columns,
            Arc::clone(&self.column_index_cache),
            values,
        )))
    }

    /// Lazy iterator over the remaining rows. It ends at the end-of-data
    /// status or after yielding the first error, and cannot be restarted.
    pub fn rows(&mut self) -> Rows<'_, S> {
        Rows {
            statement: self,
            done: false,
        }
    }

    /// Fetch every remaining row into a [`ResultSet`].
    ///
    /// # Errors
    ///
    /// See [`Statement::fetch`].
    pub fn fetch_all(&mut self) -> Result<ResultSet, SqlEngineError> {
        let mut result_set = ResultSet::with_capacity(10);
        if let Some(columns) = &self.columns {
            result_set.set_columns(Arc::clone(columns));
        }
        for row in self.rows() {
            result_set.add_row(row?);
        }
        Ok(result_set)
    }

    fn executed_native(&self, op: &str) -> Result<&S, SqlEngineError> {
        let native = self.native_ref(op)?;
        self.require(op, &[StatementState::Executed, StatementState::Fetchable])?;
        Ok(native)
    }

    /// Rows changed by the last execution.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InternalError` when the driver reports the
    /// "count unavailable" sentinel.
    pub fn affected_rows(&self) -> Result<u64, SqlEngineError> {
        let native = self.executed_native("affected_rows")?;
        checked_count(native.affected_rows(), || native.diagnostic())
    }

    /// Rows in the buffered result of the last execution.
    ///
    /// # Errors
    ///
    /// See [`Statement::affected_rows`].
    pub fn num_rows(&self) -> Result<u64, SqlEngineError> {
        let native = self.executed_native("num_rows")?;
        checked_count(native.num_rows(), || native.diagnostic())
    }

    /// Auto-increment id generated by the last execution.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a released or unexecuted
    /// handle.
    pub fn insert_id(&self) -> Result<u64, SqlEngineError> {
        Ok(self.executed_native("insert_id")?.insert_id())
    }

    /// Release the native statement. Safe to call any number of times.
    pub fn close(&mut self) {
        if let Some(mut native) = self.native.take() {
            native.close();
            tracing::debug!(sql = self.sql.as_deref().unwrap_or_default(), "closed statement");
        }
        self.state = StatementState::Closed;
    }
}

impl<S: NativeStatement> Drop for Statement<S> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<S: NativeStatement> fmt::Debug for Statement<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("state", &self.state)
            .field("sql", &self.sql)
            .field("param_count", &self.param_count)
            .field("columns", &self.columns.as_ref().map(|c| c.len()))
            .field("released", &self.native.is_none())
            .finish_non_exhaustive()
    }
}

/// Row iterator returned by [`Statement::rows`].
pub struct Rows<'a, S: NativeStatement> {
    statement: &'a mut Statement<S>,
    done: bool,
}

impl<S: NativeStatement> Iterator for Rows<'_, S> {
    type Item = Result<CustomDbRow, SqlEngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.statement.fetch() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

impl<S: NativeStatement> std::iter::FusedIterator for Rows<'_, S> {}
