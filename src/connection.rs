use std::fmt;

use crate::config::{ClientFlags, ConnectConfig};
use crate::driver::{Driver, NativeConnection};
use crate::error::{Diagnostic, SqlEngineError};
use crate::executor::{BatchOutcome, QueryResult, execute_batch};
use crate::results::checked_count;
use crate::statement::Statement;

// Reported when the client library cannot allocate a handle (CR_OUT_OF_MEMORY).
const OUT_OF_MEMORY: u32 = 2008;

/// Live half of a [`Connection`].
struct OpenConnection<C: NativeConnection> {
    native: C,
    statement: Option<Statement<C::Statement>>,
    host: String,
    user: String,
    database: Option<String>,
    flags: ClientFlags,
}

enum ConnState<C: NativeConnection> {
    Open(OpenConnection<C>),
    Closed,
}

/// A client connection and its single prepared-statement slot.
///
/// Not shareable between threads without external locking: every stateful
/// call takes `&mut self`. Use one connection per concurrent unit of work.
pub struct Connection<C: NativeConnection> {
    state: ConnState<C>,
}

impl<C: NativeConnection> Connection<C> {
    /// Allocate a handle, apply the configured options in order, then connect.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::ConfigError` naming the first option the driver
    /// refuses, and `SqlEngineError::InternalError` when no handle can be
    /// allocated or the connect call fails.
    pub fn connect<D>(driver: &D, config: &ConnectConfig) -> Result<Self, SqlEngineError>
    where
        D: Driver<Connection = C>,
    {
        let mut native = driver.init().ok_or_else(|| {
            SqlEngineError::InternalError(Diagnostic::new(
                OUT_OF_MEMORY,
                "HY000",
                "client library could not allocate a connection handle",
            ))
        })?;

        for (option, value) in &config.options {
            if native.set_option(*option, value) != 0 {
                let diag = native.diagnostic();
                native.close();
                return Err(SqlEngineError::ConfigError(format!(
                    "failed to apply option {option}: {}",
                    diag.message
                )));
            }
            tracing::trace!(%option, ?value, "applied connect option");
        }

        if native.connect(&config.params(), config.flags) != 0 {
            let diag = native.diagnostic();
            native.close();
            return Err(SqlEngineError::InternalError(diag));
        }

        tracing::debug!(
            host = %config.host,
            user = %config.user,
            database = config.database.as_deref(),
            multi_statements = config.flags.multi_statements,
            "connected"
        );
        Ok(Self {
            state: ConnState::Open(OpenConnection {
                native,
                statement: None,
                host: config.host.clone(),
                user: config.user.clone(),
                database: config.database.clone(),
                flags: config.flags,
            }),
        })
    }

    fn open(&self, op: &str) -> Result<&OpenConnection<C>, SqlEngineError> {
        match &self.state {
            ConnState::Open(open) => Ok(open),
            ConnState::Closed => Err(closed(op)),
        }
    }

    fn open_mut(&mut self, op: &str) -> Result<&mut OpenConnection<C>, SqlEngineError> {
        match &mut self.state {
            ConnState::Open(open) => Ok(open),
            ConnState::Closed => Err(closed(op)),
        }
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        matches!(self.state, ConnState::Open(_))
    }

    #[must_use]
    pub fn host(&self) -> Option<&str> {
        self.open("host").ok().map(|o| o.host.as_str())
    }

    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.open("user").ok().map(|o| o.user.as_str())
    }

    #[must_use]
    pub fn database(&self) -> Option<&str> {
        self.open("database").ok().and_then(|o| o.database.as_deref())
    }

    #[must_use]
    pub fn flags(&self) -> Option<ClientFlags> {
        self.open("flags").ok().map(|o| o.flags)
    }

    /// Run `sql` and unwrap single-statement submissions into a bare outcome.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection; see
    /// [`execute_batch`] for the rest.
    pub fn query(&mut self, sql: &str) -> Result<QueryResult, SqlEngineError> {
        Ok(self.execute_batch(sql)?.into_query_result())
    }

    /// Run `sql` and return one outcome per statement, in submission order.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection; see
    /// [`execute_batch`] for the rest.
    pub fn execute_batch(&mut self, sql: &str) -> Result<BatchOutcome, SqlEngineError> {
        let open = self.open_mut("query")?;
        execute_batch(&mut open.native, sql)
    }

    /// Escape `raw` for use inside a quoted SQL literal.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` when the driver cannot escape.
    pub fn escape(&mut self, raw: &str) -> Result<String, SqlEngineError> {
        let open = self.open_mut("escape")?;
        open.native
            .escape(raw)
            .ok_or_else(|| SqlEngineError::InternalError(open.native.diagnostic()))
    }

    /// Prepare `sql` in the connection's statement slot, closing whatever
    /// statement occupied it.
    ///
    /// A statement the driver rejects stays in the slot so its diagnostic can
    /// be read through [`Connection::statement`].
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection,
    /// `SqlEngineError::InternalError` when no statement handle can be
    /// allocated and `SqlEngineError::StatementError` when prepare fails.
    pub fn prepare(&mut self, sql: &str) -> Result<&mut Statement<C::Statement>, SqlEngineError> {
        let open = self.open_mut("prepare")?;
        if let Some(mut previous) = open.statement.take() {
            previous.close();
        }
        let native = open
            .native
            .stmt_init()
            .ok_or_else(|| SqlEngineError::InternalError(open.native.diagnostic()))?;
        let statement = open.statement.insert(Statement::new(native));
        statement.prepare(sql)?;
        Ok(statement)
    }

    /// The statement currently in the slot.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection or an
    /// empty slot.
    pub fn statement(&mut self) -> Result<&mut Statement<C::Statement>, SqlEngineError> {
        self.open_mut("statement")?
            .statement
            .as_mut()
            .ok_or_else(|| SqlEngineError::interface("no statement has been prepared"))
    }

    /// Close and release the statement slot. No-op when empty or closed.
    pub fn close_statement(&mut self) {
        if let ConnState::Open(open) = &mut self.state {
            if let Some(mut statement) = open.statement.take() {
                statement.close();
            }
        }
    }

    /// Rows changed by the most recent plain query.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` for the "count unavailable" sentinel.
    pub fn affected_rows(&self) -> Result<u64, SqlEngineError> {
        let open = self.open("affected_rows")?;
        checked_count(open.native.affected_rows(), || open.native.diagnostic())
    }

    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` when the server is unreachable.
    pub fn ping(&mut self) -> Result<(), SqlEngineError> {
        let open = self.open_mut("ping")?;
        status(&mut open.native, |n| n.ping())
    }

    /// Switch the default database.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` when the driver refuses.
    pub fn select_db(&mut self, database: &str) -> Result<(), SqlEngineError> {
        let open = self.open_mut("select_db")?;
        status(&mut open.native, |n| n.select_db(database))?;
        open.database = Some(database.to_string());
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` when the driver refuses.
    pub fn set_autocommit(&mut self, enabled: bool) -> Result<(), SqlEngineError> {
        let open = self.open_mut("set_autocommit")?;
        status(&mut open.native, |n| n.autocommit(enabled))
    }

    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` when the commit fails.
    pub fn commit(&mut self) -> Result<(), SqlEngineError> {
        let open = self.open_mut("commit")?;
        status(&mut open.native, NativeConnection::commit)
    }

    /// # Errors
    ///
    /// Returns `SqlEngineError::InterfaceError` on a closed connection and
    /// `SqlEngineError::InternalError` when the rollback fails.
    pub fn rollback(&mut self) -> Result<(), SqlEngineError> {
        let open = self.open_mut("rollback")?;
        status(&mut open.native, NativeConnection::rollback)
    }

    /// Release the statement slot and the native connection.
    ///
    /// Always leaves the connection closed; calling it again does nothing.
    pub fn close(&mut self) {
        if let ConnState::Open(mut open) = std::mem::replace(&mut self.state, ConnState::Closed) {
            if let Some(mut statement) = open.statement.take() {
                statement.close();
            }
            open.native.close();
            tracing::debug!(host = %open.host, user = %open.user, "closed connection");
        }
    }
}

fn closed(op: &str) -> SqlEngineError {
    SqlEngineError::interface(format!("{op} called on closed connection"))
}

fn status<C: NativeConnection>(
    native: &mut C,
    call: impl FnOnce(&mut C) -> i32,
) -> Result<(), SqlEngineError> {
    if call(native) == 0 {
        Ok(())
    } else {
        Err(SqlEngineError::InternalError(native.diagnostic()))
    }
}

impl<C: NativeConnection> Drop for Connection<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: NativeConnection> fmt::Debug for Connection<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.state {
            ConnState::Open(open) => f
                .debug_struct("Connection")
                .field("host", &open.host)
                .field("user", &open.user)
                .field("database", &open.database)
                .field("statement", &open.statement)
                .finish(),
            ConnState::Closed => f.write_str("Connection(closed)"),
        }
    }
}
