use std::fmt;

use thiserror::Error;

/// Driver-supplied diagnostic captured at the moment a native call failed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Diagnostic {
    /// Native error number (`errno`).
    pub code: u32,
    /// Five character SQLSTATE, `HY000` when the driver does not supply one.
    pub sqlstate: String,
    /// Human readable message from the driver.
    pub message: String,
}

impl Diagnostic {
    pub fn new(code: u32, sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sqlstate: sqlstate.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) [{}] {}", self.code, self.sqlstate, self.message)
    }
}

/// Broad classification of [`SqlEngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller misuse; detected before any native call.
    Interface,
    /// Connection-level failure reported by the driver.
    Internal,
    /// Statement-level failure reported by the driver.
    Statement,
    /// Configuration could not be loaded or applied.
    Config,
}

#[derive(Debug, Error)]
pub enum SqlEngineError {
    #[error("Interface error: {0}")]
    InterfaceError(String),

    #[error("Type mapping error: {0}")]
    TypeMappingError(String),

    #[error("Internal error {0}")]
    InternalError(Diagnostic),

    #[error("Statement error {0}")]
    StatementError(Diagnostic),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl SqlEngineError {
    pub(crate) fn interface(msg: impl Into<String>) -> Self {
        SqlEngineError::InterfaceError(msg.into())
    }

    pub(crate) fn type_mapping(msg: impl Into<String>) -> Self {
        SqlEngineError::TypeMappingError(msg.into())
    }

    /// Error kind; type mapping failures count as caller misuse.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            SqlEngineError::InterfaceError(_) | SqlEngineError::TypeMappingError(_) => {
                ErrorKind::Interface
            }
            SqlEngineError::InternalError(_) => ErrorKind::Internal,
            SqlEngineError::StatementError(_) => ErrorKind::Statement,
            SqlEngineError::ConfigError(_) => ErrorKind::Config,
        }
    }

    /// The driver diagnostic, present only for driver-reported failures.
    #[must_use]
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            SqlEngineError::InternalError(diag) | SqlEngineError::StatementError(diag) => {
                Some(diag)
            }
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SqlEngineError {
    fn from(err: serde_json::Error) -> Self {
        SqlEngineError::ConfigError(format!("invalid configuration document: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mapping_is_interface_kind() {
        let err = SqlEngineError::type_mapping("GEOMETRY");
        assert_eq!(err.kind(), ErrorKind::Interface);
        assert!(err.diagnostic().is_none());
    }

    #[test]
    fn driver_errors_carry_diagnostic() {
        let err = SqlEngineError::StatementError(Diagnostic::new(1064, "42000", "syntax"));
        assert_eq!(err.kind(), ErrorKind::Statement);
        assert_eq!(err.diagnostic().map(|d| d.code), Some(1064));
        assert_eq!(err.to_string(), "Statement error (1064) [42000] syntax");
    }
}
