//! Error Handling for the Ember Scripting Language
//!
//! This module defines the error system used throughout the lexer, parser,
//! compiler and virtual machine. Every error carries a human-readable message
//! and, where one is known at the point of failure, a source location.
//!
//! ## Error Categories
//!
//! ### Lexical Analysis Errors (`LexError`)
//! Folded into `ParseError` via the lexer's `ERROR` token: unterminated
//! strings, unknown characters.
//!
//! ### Parse Errors (`ParseError`)
//! Unexpected token, missing delimiter, malformed declaration. Fatal for the
//! current compilation; no recovery is attempted.
//!
//! ### Runtime Errors
//! Undefined variable, arity mismatch, non-callable, non-iterable, division
//! by zero, index out of range, stack overflow, unsupported operand type.
//!
//! ## Error Flow
//!
//! ```text
//! Source Code → Lexer → Parser → Compiler → VM → Output
//!      |                   |         |       |
//!   (ERROR token)     ParseError     |   RuntimeError
//!                                ParseError
//! ```

use std::error::Error;
use std::fmt;

/// A single source location, used by every error variant that can be
/// attributed to a specific place in the program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl Location {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.col)
    }
}

/// Comprehensive error type for all Ember language operations.
///
/// Covers every possible failure condition from tokenization through
/// execution, each carrying enough context for a caller to report a useful
/// diagnostic without needing to reach back into the failing component.
#[derive(Debug, Clone)]
pub enum EmberError {
    /// Syntax error during parsing, including lexical errors folded in via
    /// the lexer's `ERROR` token.
    ///
    /// # Examples
    /// - `Expected ')', found 'Newline' at line 4, col 9`
    /// - `Unterminated string at line 2, col 5`
    ParseError { message: String, loc: Location },

    /// Reference to an undefined global.
    UndefinedVariable { name: String, line: usize },

    /// Call to a value that is neither a compiled function nor a
    /// host-callable.
    NonCallable { line: usize },

    /// Wrong number of arguments passed to a compiled function.
    ArityMismatch {
        expected: usize,
        got: usize,
        line: usize,
    },

    /// Attempt to iterate (`for`) over a value that is not an array and not
    /// already an iterator.
    NonIterable { line: usize },

    /// Integer or float division (or modulo) by zero.
    DivisionByZero { line: usize },

    /// Array or string index out of bounds.
    IndexOutOfBounds { index: i64, len: usize, line: usize },

    /// An arithmetic, comparison or bitwise operation was attempted on
    /// operand types that do not support it.
    TypeMismatch { message: String, line: usize },

    /// The value stack or frame stack exceeded its fixed capacity.
    StackOverflow { line: usize },

    /// Standard-library argument validation failure (wrong arity, wrong
    /// argument type, out-of-domain numeric argument).
    ArgumentError { message: String, line: usize },

    /// Wraps `std::io::Error` from file-backed standard-library functions
    /// (`read_file`, `write_file`, `read_lines`) and from the CLI's own file
    /// loading.
    IOError(String),

    /// Any other runtime failure that does not fit a more specific variant.
    RuntimeError { message: String, line: usize },
}

impl EmberError {
    pub fn parse(message: impl Into<String>, loc: Location) -> Self {
        EmberError::ParseError {
            message: message.into(),
            loc,
        }
    }

    pub fn runtime(message: impl Into<String>, line: usize) -> Self {
        EmberError::RuntimeError {
            message: message.into(),
            line,
        }
    }

    /// Returns the source line this error is attributable to, when known.
    pub fn line(&self) -> Option<usize> {
        match self {
            EmberError::ParseError { loc, .. } => Some(loc.line),
            EmberError::UndefinedVariable { line, .. }
            | EmberError::NonCallable { line }
            | EmberError::ArityMismatch { line, .. }
            | EmberError::NonIterable { line }
            | EmberError::DivisionByZero { line }
            | EmberError::IndexOutOfBounds { line, .. }
            | EmberError::TypeMismatch { line, .. }
            | EmberError::StackOverflow { line }
            | EmberError::ArgumentError { line, .. }
            | EmberError::RuntimeError { line, .. } => Some(*line),
            EmberError::IOError(_) => None,
        }
    }

    /// True for every variant other than `ParseError` — used by callers that
    /// need to print the `"Runtime error: ..."` prefix used throughout the
    /// CLI and REPL.
    pub fn is_runtime(&self) -> bool {
        !matches!(self, EmberError::ParseError { .. })
    }
}

impl fmt::Display for EmberError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EmberError::ParseError { message, loc } => write!(f, "{} at {}", message, loc),
            EmberError::UndefinedVariable { name, line } => {
                write!(f, "undefined variable '{}' at line {}", name, line)
            }
            EmberError::NonCallable { line } => {
                write!(f, "value is not callable at line {}", line)
            }
            EmberError::ArityMismatch {
                expected,
                got,
                line,
            } => write!(
                f,
                "expected {} argument(s), got {} at line {}",
                expected, got, line
            ),
            EmberError::NonIterable { line } => {
                write!(f, "value is not iterable at line {}", line)
            }
            EmberError::DivisionByZero { line } => write!(f, "division by zero at line {}", line),
            EmberError::IndexOutOfBounds { index, len, line } => write!(
                f,
                "index {} out of bounds for length {} at line {}",
                index, len, line
            ),
            EmberError::TypeMismatch { message, line } => {
                write!(f, "{} at line {}", message, line)
            }
            EmberError::StackOverflow { line } => write!(f, "stack overflow at line {}", line),
            EmberError::ArgumentError { message, line } => {
                write!(f, "{} at line {}", message, line)
            }
            EmberError::IOError(msg) => write!(f, "{}", msg),
            EmberError::RuntimeError { message, line } => {
                write!(f, "{} at line {}", message, line)
            }
        }
    }
}

impl Error for EmberError {}

impl From<std::io::Error> for EmberError {
    fn from(err: std::io::Error) -> Self {
        EmberError::IOError(err.to_string())
    }
}

/// Convenience alias used throughout the pipeline in place of the more
/// verbose `std::result::Result<T, EmberError>`.
pub type Result<T> = std::result::Result<T, EmberError>;
