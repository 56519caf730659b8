use crate::driver::{NO_MORE_RESULTS, NativeConnection};
use crate::error::SqlEngineError;
use crate::results::{ResultSet, checked_count, materialize};

/// Outcome of one statement inside a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// Rows changed by a statement that returns no result set.
    Affected(u64),
    /// Materialized rows of a statement that returns a result set.
    Rows(ResultSet),
}

impl QueryOutcome {
    #[must_use]
    pub fn as_rows(&self) -> Option<&ResultSet> {
        if let QueryOutcome::Rows(rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    #[must_use]
    pub fn into_rows(self) -> Option<ResultSet> {
        if let QueryOutcome::Rows(rows) = self {
            Some(rows)
        } else {
            None
        }
    }

    #[must_use]
    pub fn affected(&self) -> Option<u64> {
        if let QueryOutcome::Affected(count) = self {
            Some(*count)
        } else {
            None
        }
    }
}

/// Ordered outcomes of a multi-statement submission, one per statement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchOutcome {
    entries: Vec<QueryOutcome>,
}

impl BatchOutcome {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&QueryOutcome> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, QueryOutcome> {
        self.entries.iter()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<QueryOutcome> {
        self.entries
    }

    /// Unwrap a one-statement batch into its bare outcome.
    #[must_use]
    pub fn into_query_result(mut self) -> QueryResult {
        if self.entries.len() == 1 {
            if let Some(single) = self.entries.pop() {
                return QueryResult::Single(single);
            }
        }
        QueryResult::Multiple(self.entries)
    }
}

impl IntoIterator for BatchOutcome {
    type Item = QueryOutcome;
    type IntoIter = std::vec::IntoIter<QueryOutcome>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Result of [`Connection::query`](crate::Connection::query): a bare outcome
/// for single statements, the full sequence otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    Single(QueryOutcome),
    Multiple(Vec<QueryOutcome>),
}

impl QueryResult {
    /// The single outcome, if this was a one-statement submission.
    #[must_use]
    pub fn single(&self) -> Option<&QueryOutcome> {
        if let QueryResult::Single(outcome) = self {
            Some(outcome)
        } else {
            None
        }
    }

    /// All outcomes in submission order.
    #[must_use]
    pub fn into_outcomes(self) -> Vec<QueryOutcome> {
        match self {
            QueryResult::Single(outcome) => vec![outcome],
            QueryResult::Multiple(outcomes) => outcomes,
        }
    }
}

/// Submit `sql` and collect one outcome per statement.
///
/// Several `;`-separated statements are accepted only when the connection was
/// opened with the `multi_statements` flag. The batch aborts at the first
/// error and never returns a partial outcome; results still pending on the
/// connection are drained so it stays usable.
///
/// # Errors
///
/// Returns `SqlEngineError::InternalError` when the driver rejects the query,
/// fails to advance to the next result, or cannot report a row count,
/// `SqlEngineError::InterfaceError` when a statement declares columns but no
/// result set materializes, and any materialization error.
pub fn execute_batch<C: NativeConnection>(
    native: &mut C,
    sql: &str,
) -> Result<BatchOutcome, SqlEngineError> {
    if native.query(sql) != 0 {
        return Err(SqlEngineError::InternalError(native.diagnostic()));
    }

    let mut entries = Vec::new();
    loop {
        let outcome = match collect_current(native) {
            Ok(outcome) => outcome,
            Err(err) => {
                drain_pending(native);
                return Err(err);
            }
        };
        tracing::debug!(
            index = entries.len(),
            rows = outcome.as_rows().map(ResultSet::len),
            affected = outcome.affected(),
            "batch entry"
        );
        entries.push(outcome);

        match native.next_result() {
            0 => {}
            NO_MORE_RESULTS => break,
            status => {
                let diag = native.diagnostic();
                tracing::debug!(status, code = diag.code, "next_result failed");
                return Err(SqlEngineError::InternalError(diag));
            }
        }
    }

    Ok(BatchOutcome { entries })
}

fn collect_current<C: NativeConnection>(native: &mut C) -> Result<QueryOutcome, SqlEngineError> {
    if let Some(mut result) = native.store_result() {
        return Ok(QueryOutcome::Rows(materialize(&mut result)?));
    }
    if native.field_count() == 0 {
        let count = checked_count(native.affected_rows(), || native.diagnostic())?;
        return Ok(QueryOutcome::Affected(count));
    }
    if native.errno() != 0 {
        return Err(SqlEngineError::InternalError(native.diagnostic()));
    }
    Err(SqlEngineError::interface(
        "query expected to produce results but did not",
    ))
}

fn drain_pending<C: NativeConnection>(native: &mut C) {
    let mut drained = 0_usize;
    while native.next_result() == 0 {
        drop(native.store_result());
        drained += 1;
    }
    if drained > 0 {
        tracing::warn!(drained, "discarded pending results of an aborted batch");
    }
}
