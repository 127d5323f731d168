// ABOUTME: Error types for read, expansion and evaluation failures

use crate::value::Value;
use thiserror::Error;

// ===== Arity constant strings (eliminates allocations in error paths) =====
pub const ARITY_ONE: &str = "1";
pub const ARITY_TWO: &str = "2";
pub const ARITY_THREE: &str = "3";
pub const ARITY_AT_LEAST_ONE: &str = "at least 1";
pub const ARITY_AT_LEAST_TWO: &str = "at least 2";
pub const ARITY_ONE_OR_TWO: &str = "1-2";

#[derive(Error, Debug, Clone)]
pub enum SchemeError {
    /// Malformed form caught by the reader or the expander
    #[error("SyntaxError: {form}: {message}")]
    Syntax { form: String, message: String },

    /// A primitive or special form received a value of the wrong kind
    #[error("TypeError: {function}: expected {expected}, got {actual}")]
    Type {
        function: String,
        expected: String,
        actual: String,
    },

    /// Unbound symbol
    #[error("LookupError: unbound {0}")]
    Lookup(String),

    /// Procedure applied with the wrong number of arguments
    #[error("ArityError: {function}: expected {expected} argument{}, got {actual}", if *.expected == "1" { "" } else { "s" })]
    Arity {
        function: String,
        expected: String,
        actual: usize,
    },

    /// Division by zero, invalid index, overflow and friends
    #[error("RuntimeError: {0}")]
    Runtime(String),

    /// File not found, closed port and other I/O failures
    #[error("IOError: {0}")]
    Io(String),
}

impl SchemeError {
    /// Create a syntax error reporting the offending subtree
    pub fn syntax(form: &Value, message: impl Into<String>) -> Self {
        SchemeError::Syntax {
            form: form.to_string(),
            message: message.into(),
        }
    }

    /// Create a type error with the actual value's type name filled in
    pub fn type_error(function: &str, expected: &str, actual: &Value) -> Self {
        SchemeError::Type {
            function: function.to_string(),
            expected: expected.to_string(),
            actual: actual.type_name(),
        }
    }

    /// Create an arity error with expected and actual counts
    pub fn arity(function: &str, expected: impl Into<String>, actual: usize) -> Self {
        SchemeError::Arity {
            function: function.to_string(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        SchemeError::Runtime(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        SchemeError::Io(message.into())
    }
}

impl From<std::io::Error> for SchemeError {
    fn from(err: std::io::Error) -> Self {
        SchemeError::Io(err.to_string())
    }
}
