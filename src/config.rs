use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::connection::Connection;
use crate::driver::Driver;
use crate::error::SqlEngineError;

pub const DEFAULT_PORT: u16 = 3306;

/// Options applied to a handle before connecting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum ConnectOption {
    Reconnect,
    ConnectTimeout,
    ReadTimeout,
    WriteTimeout,
    Compress,
    InitCommand,
    Charset,
    LocalInfile,
}

impl fmt::Display for ConnectOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_possible_value() {
            Some(value) => f.write_str(value.get_name()),
            None => write!(f, "{self:?}"),
        }
    }
}

impl FromStr for ConnectOption {
    type Err = SqlEngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true)
            .map_err(|_| SqlEngineError::ConfigError(format!("unknown connect option '{s}'")))
    }
}

/// Value for a [`ConnectOption`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    UInt(u64),
    Text(String),
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<u64> for OptionValue {
    fn from(v: u64) -> Self {
        OptionValue::UInt(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Text(v.to_string())
    }
}

/// Client capabilities negotiated at connect time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientFlags {
    /// Allow several `;`-separated statements in one query.
    pub multi_statements: bool,
    pub multi_results: bool,
    pub compress: bool,
    /// Report matched rather than changed rows as the affected count.
    pub found_rows: bool,
}

impl ClientFlags {
    const FOUND_ROWS: u64 = 1 << 1;
    const COMPRESS: u64 = 1 << 5;
    const MULTI_STATEMENTS: u64 = 1 << 16;
    const MULTI_RESULTS: u64 = 1 << 17;

    /// Capability bits in the client library's numbering.
    #[must_use]
    pub fn bits(self) -> u64 {
        let mut bits = 0;
        if self.found_rows {
            bits |= Self::FOUND_ROWS;
        }
        if self.compress {
            bits |= Self::COMPRESS;
        }
        if self.multi_statements {
            bits |= Self::MULTI_STATEMENTS;
        }
        if self.multi_results {
            bits |= Self::MULTI_RESULTS;
        }
        bits
    }
}

/// Connection settings.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectConfig {
    pub host: String,
    pub user: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub socket: Option<String>,
    #[serde(default)]
    pub flags: ClientFlags,
    #[serde(default)]
    pub options: BTreeMap<ConnectOption, OptionValue>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl fmt::Debug for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectConfig")
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("database", &self.database)
            .field("port", &self.port)
            .field("socket", &self.socket)
            .field("flags", &self.flags)
            .field("options", &self.options)
            .finish()
    }
}

impl ConnectConfig {
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            password: None,
            database: None,
            port: DEFAULT_PORT,
            socket: None,
            flags: ClientFlags::default(),
            options: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn builder(host: impl Into<String>, user: impl Into<String>) -> ConnectConfigBuilder {
        ConnectConfigBuilder::new(host, user)
    }

    /// Load settings from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `SqlEngineError::ConfigError` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, SqlEngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Borrowed view handed to the driver's `connect`.
    #[must_use]
    pub fn params(&self) -> ConnectParams<'_> {
        ConnectParams {
            host: &self.host,
            user: &self.user,
            password: self.password.as_deref(),
            database: self.database.as_deref(),
            port: self.port,
            socket: self.socket.as_deref(),
        }
    }
}

/// Arguments of the native connect call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectParams<'a> {
    pub host: &'a str,
    pub user: &'a str,
    pub password: Option<&'a str>,
    pub database: Option<&'a str>,
    pub port: u16,
    pub socket: Option<&'a str>,
}

/// Fluent builder for [`ConnectConfig`].
#[derive(Debug, Clone)]
pub struct ConnectConfigBuilder {
    config: ConnectConfig,
}

impl ConnectConfigBuilder {
    #[must_use]
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            config: ConnectConfig::new(host, user),
        }
    }

    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    #[must_use]
    pub fn socket(mut self, socket: impl Into<String>) -> Self {
        self.config.socket = Some(socket.into());
        self
    }

    #[must_use]
    pub fn multi_statements(mut self, enabled: bool) -> Self {
        self.config.flags.multi_statements = enabled;
        self.config.flags.multi_results |= enabled;
        self
    }

    #[must_use]
    pub fn flags(mut self, flags: ClientFlags) -> Self {
        self.config.flags = flags;
        self
    }

    #[must_use]
    pub fn option(mut self, option: ConnectOption, value: impl Into<OptionValue>) -> Self {
        self.config.options.insert(option, value.into());
        self
    }

    #[must_use]
    pub fn finish(self) -> ConnectConfig {
        self.config
    }

    /// Connect with the finished settings.
    ///
    /// # Errors
    ///
    /// See [`Connection::connect`].
    pub fn connect<D: Driver>(self, driver: &D) -> Result<Connection<D::Connection>, SqlEngineError> {
        Connection::connect(driver, &self.finish())
    }
}
