//! Error types for the thenable runtime

use crate::runtime::Value;
use std::fmt;
use thiserror::Error;

/// Main error type for thenable
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Error {
    /// Runtime error - TypeError, RangeError, etc.
    #[error("{kind}: {message}")]
    RuntimeError { kind: ErrorKind, message: String },

    /// Resource limit exceeded while driving the event loop
    #[error("ResourceLimitError: {kind}: {message}")]
    ResourceLimitError {
        kind: ResourceLimitKind,
        message: String,
    },

    /// Invalid configuration document
    #[error("ConfigError: {source}")]
    ConfigError {
        #[from]
        source: serde_json::Error,
    },

    /// A driven future settled as rejected
    #[error("Uncaught (in future): {reason}")]
    Rejected { reason: Value },

    /// The event loop ran out of work while the driven future was still pending
    #[error("event loop is idle but the future never settled")]
    Stalled,
}

/// Resource limit kinds for event loop enforcement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimitKind {
    /// Too many event loop iterations
    TickLimit,
}

impl fmt::Display for ResourceLimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLimitKind::TickLimit => write!(f, "TickLimit"),
        }
    }
}

/// Error kinds carried by runtime errors and error-object values
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[allow(clippy::enum_variant_names)]
pub enum ErrorKind {
    /// TypeError - wrong type for operation
    TypeError,
    /// RangeError - value out of range
    RangeError,
    /// Generic Error - user-raised failures
    GenericError,
    /// AggregateError - several failures reported together
    AggregateError,
    /// InternalError - internal runtime error
    InternalError,
}

impl ErrorKind {
    /// The conventional constructor name for this kind
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TypeError => "TypeError",
            ErrorKind::RangeError => "RangeError",
            ErrorKind::GenericError => "Error",
            ErrorKind::AggregateError => "AggregateError",
            ErrorKind::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Error {
    /// Create a TypeError
    pub fn type_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::TypeError,
            message: message.into(),
        }
    }

    /// Create a RangeError
    pub fn range_error(message: impl Into<String>) -> Self {
        Error::RuntimeError {
            kind: ErrorKind::RangeError,
            message: message.into(),
        }
    }

    /// Create a tick limit exceeded error
    pub fn tick_limit_exceeded(ticks: u64, limit: u64) -> Self {
        Error::ResourceLimitError {
            kind: ResourceLimitKind::TickLimit,
            message: format!(
                "Event loop tick limit exceeded: {} ticks run, limit was {}",
                ticks, limit
            ),
        }
    }

    /// The error kind this error maps to when surfaced as a rejection reason
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::RuntimeError { kind, .. } => *kind,
            Error::ResourceLimitError { .. } => ErrorKind::RangeError,
            Error::ConfigError { .. } => ErrorKind::TypeError,
            Error::Rejected { .. } => ErrorKind::GenericError,
            Error::Stalled => ErrorKind::InternalError,
        }
    }
}

/// Result type alias for thenable
pub type Result<T> = std::result::Result<T, Error>;

/// Standardized error message templates
pub mod messages {
    pub const CHAINING_CYCLE: &str = "Chaining cycle detected for future";
    pub const ALL_REJECTED: &str = "All futures were rejected";

    /// Format an "expected X, got Y" error message
    pub fn expected(what: &str, got: &str) -> String {
        format!("expected {}, got {}", what, got)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_error_display() {
        let err = Error::type_error("expected number, got string");
        assert_eq!(err.to_string(), "TypeError: expected number, got string");
        assert_eq!(err.kind(), ErrorKind::TypeError);
    }

    #[test]
    fn test_tick_limit_display() {
        let err = Error::tick_limit_exceeded(11, 10);
        assert_eq!(
            err.to_string(),
            "ResourceLimitError: TickLimit: Event loop tick limit exceeded: 11 ticks run, limit was 10"
        );
    }

    #[test]
    fn test_config_error_from_json() {
        let parse = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = parse.unwrap_err().into();
        assert!(matches!(err, Error::ConfigError { .. }));
        assert!(err.to_string().starts_with("ConfigError:"));
    }

    #[test]
    fn test_rejected_display() {
        let err = Error::Rejected {
            reason: Value::from("boom"),
        };
        assert_eq!(err.to_string(), "Uncaught (in future): boom");
    }

    #[test]
    fn test_error_kind_names() {
        assert_eq!(ErrorKind::GenericError.to_string(), "Error");
        assert_eq!(ErrorKind::AggregateError.to_string(), "AggregateError");
    }
}
