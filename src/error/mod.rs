//! Error handling and diagnostics for the Keel language
//!
//! Every stage reports through [`KeelError`]. Syntax errors come from the
//! lexer and parser, runtime errors from evaluation and builtins, and
//! internal errors flag a defect in the engine itself.

use std::fmt;
use thiserror::Error;

pub mod diagnostic;

pub use diagnostic::Diagnostic;

/// Result type alias for Keel operations
pub type KeelResult<T> = Result<T, KeelError>;

/// Source location information for error reporting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Optional filename
    pub filename: Option<String>,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize, filename: Option<String>) -> Self {
        Self {
            line,
            column,
            filename,
        }
    }

    /// Create a source location without a filename
    pub fn at(line: usize, column: usize) -> Self {
        Self::new(line, column, None)
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref filename) = self.filename {
            write!(f, "{}:{}:{}", filename, self.line, self.column)
        } else {
            write!(f, "{}:{}", self.line, self.column)
        }
    }
}

fn suffix(location: &Option<SourceLocation>) -> String {
    location
        .as_ref()
        .map(|location| format!(" at {}", location))
        .unwrap_or_default()
}

/// Main error type for the Keel language
#[derive(Debug, Clone, Error)]
pub enum KeelError {
    /// Lexical or grammatical error; raised before anything is evaluated
    #[error("Syntax Error: {message} at {location}")]
    SyntaxError {
        message: String,
        location: SourceLocation,
    },
    /// Evaluation error, including failures reported by builtins
    #[error("Runtime Error: {message}{}", suffix(.location))]
    RuntimeError {
        message: String,
        location: Option<SourceLocation>,
        /// Innermost task that was running when the error was raised
        task: Option<String>,
    },
    /// The engine met a node it cannot handle. Never caused by user input.
    #[error("Internal Error: {message} (this is a bug in keel)")]
    InternalError { message: String },
}

impl KeelError {
    /// Create a new syntax error
    pub fn syntax_error(message: impl Into<String>, location: SourceLocation) -> Self {
        Self::SyntaxError {
            message: message.into(),
            location,
        }
    }

    /// Create a new runtime error
    pub fn runtime_error(message: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self::RuntimeError {
            message: message.into(),
            location,
            task: None,
        }
    }

    /// Create a new internal error
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }

    /// Attach a location to a runtime error that has none yet.
    pub fn or_at(self, at: &SourceLocation) -> Self {
        match self {
            Self::RuntimeError {
                message,
                location: None,
                task,
            } => Self::RuntimeError {
                message,
                location: Some(at.clone()),
                task,
            },
            other => other,
        }
    }

    /// Record the running task on a runtime error that has none yet.
    pub fn in_task(self, name: &str) -> Self {
        match self {
            Self::RuntimeError {
                message,
                location,
                task: None,
            } => Self::RuntimeError {
                message,
                location,
                task: Some(name.to_string()),
            },
            other => other,
        }
    }

    /// Get the error kind as a string
    pub fn kind(&self) -> &str {
        match self {
            Self::SyntaxError { .. } => "Syntax Error",
            Self::RuntimeError { .. } => "Runtime Error",
            Self::InternalError { .. } => "Internal Error",
        }
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            Self::SyntaxError { message, .. }
            | Self::RuntimeError { message, .. }
            | Self::InternalError { message } => message,
        }
    }

    /// Get the source location if available
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            Self::SyntaxError { location, .. } => Some(location),
            Self::RuntimeError { location, .. } => location.as_ref(),
            Self::InternalError { .. } => None,
        }
    }

    pub fn task(&self) -> Option<&str> {
        match self {
            Self::RuntimeError { task, .. } => task.as_deref(),
            _ => None,
        }
    }

    pub fn is_internal(&self) -> bool {
        matches!(self, Self::InternalError { .. })
    }
}
