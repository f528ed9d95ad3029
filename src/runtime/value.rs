//! Runtime values carried by futures
//!
//! Success values and failure reasons share one dynamically-typed [`Value`],
//! so a chain can fulfill with a number, reject with an error object and
//! recover with a string without any conversion glue.

use super::future::{Future, FutureState, Thenable};
use crate::error::{messages, Error, ErrorKind, Result};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::fmt;
use std::rc::Rc;

/// A value carried by a future
#[derive(Clone)]
pub enum Value {
    /// undefined
    Undefined,
    /// null
    Null,
    /// Boolean value
    Boolean(bool),
    /// Number (IEEE 754 double)
    Number(f64),
    /// String
    String(String),
    /// Ordered sequence of values
    Array(Vec<Value>),
    /// Error object (TypeError, AggregateError, ...)
    Error(Rc<ErrorObject>),
    /// Outcome record produced by `all_settled`
    Settled(Box<Settled>),
    /// A future of this runtime
    Future(Future),
    /// A foreign future-like value
    Thenable(Rc<dyn Thenable>),
}

impl Value {
    /// Check if value is undefined
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Check if value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Create an error object value
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Value {
        Value::Error(Rc::new(ErrorObject::new(kind, message)))
    }

    /// Create a TypeError value
    pub fn type_error(message: impl Into<String>) -> Value {
        Value::error(ErrorKind::TypeError, message)
    }

    /// Create an AggregateError value holding `errors` in order
    pub fn aggregate_error(errors: Vec<Value>, message: impl Into<String>) -> Value {
        Value::Error(Rc::new(ErrorObject::aggregate(errors, message)))
    }

    /// Get the type name used in diagnostics
    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Array(_) => "array",
            Value::Error(_) => "error",
            Value::Settled(_) => "settled",
            Value::Future(_) => "future",
            Value::Thenable(_) => "thenable",
        }
    }

    /// Read a number, failing with a TypeError for any other type
    pub fn as_number(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(Error::type_error(messages::expected("number", other.type_of()))),
        }
    }

    /// Read a string slice
    pub fn as_str(&self) -> Result<&str> {
        match self {
            Value::String(s) => Ok(s.as_str()),
            other => Err(Error::type_error(messages::expected("string", other.type_of()))),
        }
    }

    /// Read array elements
    pub fn as_array(&self) -> Result<&[Value]> {
        match self {
            Value::Array(elements) => Ok(elements.as_slice()),
            other => Err(Error::type_error(messages::expected("array", other.type_of()))),
        }
    }

    /// Read an error object
    pub fn as_error(&self) -> Result<&ErrorObject> {
        match self {
            Value::Error(err) => Ok(err.as_ref()),
            other => Err(Error::type_error(messages::expected("error", other.type_of()))),
        }
    }

    /// Read an outcome record
    pub fn as_settled(&self) -> Result<&Settled> {
        match self {
            Value::Settled(settled) => Ok(settled.as_ref()),
            other => Err(Error::type_error(messages::expected("settled", other.type_of()))),
        }
    }

    /// The future this value wraps, if any
    pub fn as_future(&self) -> Option<&Future> {
        match self {
            Value::Future(future) => Some(future),
            _ => None,
        }
    }

    /// Capability check used by assimilation: anything that can register
    /// continuations is followed instead of stored.
    pub fn as_thenable(&self) -> Option<Rc<dyn Thenable>> {
        match self {
            Value::Future(future) => Some(Rc::new(future.clone()) as Rc<dyn Thenable>),
            Value::Thenable(thenable) => Some(thenable.clone()),
            _ => None,
        }
    }

    /// Strict equality: structural for data, identity for futures and thenables
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_equals(y))
            }
            (Value::Error(a), Value::Error(b)) => Rc::ptr_eq(a, b) || a == b,
            (Value::Settled(a), Value::Settled(b)) => a == b,
            (Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
            (Value::Thenable(a), Value::Thenable(b)) => {
                Rc::as_ptr(a) as *const () == Rc::as_ptr(b) as *const ()
            }
            _ => false,
        }
    }

    /// Render the value the way a script console would
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => {
                if n.is_nan() {
                    "NaN".to_string()
                } else if n.is_infinite() {
                    if *n > 0.0 {
                        "Infinity".to_string()
                    } else {
                        "-Infinity".to_string()
                    }
                } else if *n == 0.0 {
                    "0".to_string()
                } else {
                    format!("{}", n)
                }
            }
            Value::String(s) => s.clone(),
            Value::Array(elements) => {
                let elements: Vec<String> = elements.iter().map(|v| v.to_display_string()).collect();
                elements.join(",")
            }
            Value::Error(err) => err.to_string(),
            Value::Settled(settled) => match settled.as_ref() {
                Settled::Fulfilled { value } => {
                    format!("{{ status: fulfilled, value: {} }}", value.to_display_string())
                }
                Settled::Rejected { reason } => {
                    format!("{{ status: rejected, reason: {} }}", reason.to_display_string())
                }
            },
            Value::Future(_) => "[object Future]".to_string(),
            Value::Thenable(_) => "[object Thenable]".to_string(),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.strict_equals(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Array(elements) => write!(f, "{:?}", elements),
            Value::Error(err) => write!(f, "{:?}", err),
            Value::Settled(settled) => write!(f, "{:?}", settled),
            Value::Future(future) => write!(f, "Future#{}", future.id()),
            Value::Thenable(_) => write!(f, "[Thenable]"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_display_string())
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Undefined | Value::Null => serializer.serialize_unit(),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            // Integral numbers serialize as integers so `[1,2,3]` reads back as written
            Value::Number(n) if n.fract() == 0.0 && n.abs() < i64::MAX as f64 => {
                serializer.serialize_i64(*n as i64)
            }
            Value::Number(n) => serializer.serialize_f64(*n),
            Value::String(s) => serializer.serialize_str(s),
            Value::Array(elements) => {
                let mut seq = serializer.serialize_seq(Some(elements.len()))?;
                for element in elements {
                    seq.serialize_element(element)?;
                }
                seq.end()
            }
            Value::Error(err) => err.serialize(serializer),
            Value::Settled(settled) => settled.serialize(serializer),
            Value::Future(_) | Value::Thenable(_) => {
                serializer.serialize_str(&self.to_display_string())
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(elements: Vec<Value>) -> Self {
        Value::Array(elements)
    }
}

impl From<Future> for Value {
    fn from(future: Future) -> Self {
        Value::Future(future)
    }
}

impl From<&Future> for Value {
    fn from(future: &Future) -> Self {
        Value::Future(future.clone())
    }
}

impl From<Settled> for Value {
    fn from(settled: Settled) -> Self {
        Value::Settled(Box::new(settled))
    }
}

impl From<ErrorObject> for Value {
    fn from(err: ErrorObject) -> Self {
        Value::Error(Rc::new(err))
    }
}

/// Rust-level errors become error-object reasons, so continuations can use `?`
impl From<Error> for Value {
    fn from(err: Error) -> Self {
        match err {
            Error::Rejected { reason } => reason,
            Error::RuntimeError { kind, message } => Value::error(kind, message),
            other => Value::error(other.kind(), other.to_string()),
        }
    }
}

/// An error object carried as a failure reason
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorObject {
    /// Error kind (TypeError, AggregateError, ...)
    pub kind: ErrorKind,
    /// Human-readable message
    pub message: String,
    /// Constituent reasons, in input order (AggregateError only)
    pub errors: Vec<Value>,
}

impl ErrorObject {
    /// Create an error object without constituents
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            errors: Vec::new(),
        }
    }

    /// Create an AggregateError
    pub fn aggregate(errors: Vec<Value>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::AggregateError,
            message: message.into(),
            errors,
        }
    }

    /// Whether this is an AggregateError
    pub fn is_aggregate(&self) -> bool {
        self.kind == ErrorKind::AggregateError
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl Serialize for ErrorObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let entries = if self.is_aggregate() { 3 } else { 2 };
        let mut map = serializer.serialize_map(Some(entries))?;
        map.serialize_entry("name", self.kind.name())?;
        map.serialize_entry("message", &self.message)?;
        if self.is_aggregate() {
            map.serialize_entry("errors", &self.errors)?;
        }
        map.end()
    }
}

/// Outcome record of one input to `all_settled`
#[derive(Debug, Clone, PartialEq)]
pub enum Settled {
    /// The input fulfilled with `value`
    Fulfilled { value: Value },
    /// The input rejected with `reason`
    Rejected { reason: Value },
}

impl Settled {
    /// The settled state this record reports
    pub fn status(&self) -> FutureState {
        match self {
            Settled::Fulfilled { .. } => FutureState::Fulfilled,
            Settled::Rejected { .. } => FutureState::Rejected,
        }
    }

    /// The value or reason, whichever applies
    pub fn payload(&self) -> &Value {
        match self {
            Settled::Fulfilled { value } => value,
            Settled::Rejected { reason } => reason,
        }
    }

    /// Whether the input fulfilled
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled { .. })
    }

    /// Convert to `Ok(value)` / `Err(reason)`
    pub fn into_result(self) -> std::result::Result<Value, Value> {
        match self {
            Settled::Fulfilled { value } => Ok(value),
            Settled::Rejected { reason } => Err(reason),
        }
    }
}

impl Serialize for Settled {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("status", &self.status())?;
        match self {
            Settled::Fulfilled { value } => map.serialize_entry("value", value)?,
            Settled::Rejected { reason } => map.serialize_entry("reason", reason)?,
        }
        map.end()
    }
}
