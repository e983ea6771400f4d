use thiserror::Error;

use crate::tasks::model::{TaskId, TaskStatus};

/// Unified error type for the calculator core
#[derive(Debug, Error)]
pub enum CalcError {
    /// A fragment of the input is not a number, a known operator or a bracket
    #[error("Unrecognised token '{fragment}' at offset {position}")]
    Lex { fragment: String, position: usize },

    #[error("Mismatched brackets")]
    MismatchedBrackets,

    /// The token sequence does not form a complete binary expression
    #[error("Malformed expression: {reason}")]
    MalformedExpression { reason: String },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Unknown task: {task_id}")]
    UnknownTask { task_id: TaskId },

    #[error("Task {task_id} is not running (status: {status:?})")]
    TaskNotRunning { task_id: TaskId, status: TaskStatus },

    #[error("Expression not found: {id}")]
    ExpressionNotFound { id: String },

    #[error("Configuration error: {message}")]
    Configuration {
        message: String,
        field: Option<String>,
    },

    #[error("IO operation failed: {operation}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl CalcError {
    /// Create a lex error for a fragment found at `position`
    pub fn lex<S: Into<String>>(fragment: S, position: usize) -> Self {
        Self::Lex {
            fragment: fragment.into(),
            position,
        }
    }

    pub fn malformed<S: Into<String>>(reason: S) -> Self {
        Self::MalformedExpression {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
            field: None,
        }
    }

    /// Create a configuration error pointing at a specific field
    pub fn configuration_field<S: Into<String>, F: Into<String>>(message: S, field: F) -> Self {
        Self::Configuration {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    pub fn io<S: Into<String>>(operation: S, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// True for errors raised while turning text into tasks
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            Self::Lex { .. } | Self::MismatchedBrackets | Self::MalformedExpression { .. }
        )
    }

    /// True when the caller sent something the core rejects, as opposed to
    /// a failure of the environment (config files, IO)
    pub fn is_client_error(&self) -> bool {
        match self {
            Self::Lex { .. }
            | Self::MismatchedBrackets
            | Self::MalformedExpression { .. }
            | Self::DivisionByZero
            | Self::UnknownTask { .. }
            | Self::TaskNotRunning { .. }
            | Self::ExpressionNotFound { .. } => true,
            Self::Configuration { .. } | Self::Io { .. } | Self::Yaml(_) => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            Self::Lex { .. } => "lex",
            Self::MismatchedBrackets => "brackets",
            Self::MalformedExpression { .. } => "malformed",
            Self::DivisionByZero => "arithmetic",
            Self::UnknownTask { .. } | Self::TaskNotRunning { .. } => "task",
            Self::ExpressionNotFound { .. } => "expression",
            Self::Configuration { .. } | Self::Yaml(_) => "configuration",
            Self::Io { .. } => "io",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, CalcError>;

impl From<std::io::Error> for CalcError {
    fn from(err: std::io::Error) -> Self {
        Self::io("io_operation", err)
    }
}
