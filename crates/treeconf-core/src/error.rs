//! Error types for treeconf
//!
//! Every failure is a single structured [`Error`] carrying its kind, the
//! config path it concerns (if any), the underlying diagnostic, and an
//! actionable help message.

use std::fmt;

/// Result type alias for treeconf operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for treeconf operations
#[derive(Debug, Clone)]
pub struct Error {
    /// The kind of error that occurred
    pub kind: ErrorKind,
    /// Path in the config where the error occurred (e.g., "server.port")
    pub path: Option<String>,
    /// Actionable help message
    pub help: Option<String>,
    /// Underlying diagnostic (as string for Clone compatibility)
    pub cause: Option<String>,
}

/// Categories of errors that can occur
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A decoder rejected its input, or no decoder exists for the format
    Format { format: String },
    /// A path segment does not exist
    PathNotFound,
    /// The node exists but has the wrong kind
    TypeMismatch { expected: String, actual: String },
    /// A predicate or registered type rejected the value
    ValidationFailed,
    /// No validator registered under this type name
    UnknownType { name: String },
    /// No constructor registered under this class name
    UndefinedClass { name: String },
    /// A chain of references leads back to itself
    CycleDetected,
    /// Reading a configuration source failed
    Io,
    /// Internal error (bug in treeconf, or a poisoned lock)
    Internal,
}

impl Error {
    /// Create a format (decode-time) error
    pub fn format(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Format {
                format: format.into(),
            },
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Create an error for a format tag with no registered decoder
    pub fn unsupported_format(format: impl Into<String>, known: &[String]) -> Self {
        let known_str = if known.is_empty() {
            "(none)".to_string()
        } else {
            known.join(", ")
        };
        Self {
            kind: ErrorKind::Format {
                format: format.into(),
            },
            path: None,
            help: Some(format!("Supported formats: {}", known_str)),
            cause: Some("Unsupported file type".into()),
        }
    }

    /// Create a path not found error
    pub fn path_not_found(path: impl Into<String>) -> Self {
        let path_str = path.into();
        Self {
            kind: ErrorKind::PathNotFound,
            path: Some(path_str.clone()),
            help: Some(format!(
                "Check that '{}' exists in the configuration",
                path_str
            )),
            cause: None,
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        let expected = expected.into();
        let p = path.into();
        Self {
            kind: ErrorKind::TypeMismatch {
                expected: expected.clone(),
                actual: actual.into(),
            },
            path: if p.is_empty() { None } else { Some(p) },
            help: Some(format!("Change the value to a {}", expected)),
            cause: None,
        }
    }

    /// Create a validation error
    pub fn validation(path: impl Into<String>, message: impl Into<String>) -> Self {
        let p = path.into();
        Self {
            kind: ErrorKind::ValidationFailed,
            path: if p.is_empty() { None } else { Some(p) },
            help: Some("Fix the value to satisfy the constraint".into()),
            cause: Some(message.into()),
        }
    }

    /// Create an unknown type error
    pub fn unknown_type(name: impl Into<String>) -> Self {
        let n = name.into();
        Self {
            kind: ErrorKind::UnknownType { name: n.clone() },
            path: None,
            help: Some(format!("Register the '{}' type or check for typos", n)),
            cause: None,
        }
    }

    /// Create an undefined class error
    pub fn undefined_class(name: impl Into<String>) -> Self {
        let n = name.into();
        Self {
            kind: ErrorKind::UndefinedClass { name: n.clone() },
            path: None,
            help: Some(format!("Define the '{}' class before instantiating it", n)),
            cause: None,
        }
    }

    /// Create a cycle detected error
    pub fn cycle_detected(path: impl Into<String>, chain: Vec<String>) -> Self {
        let chain_str = chain.join(" → ");
        Self {
            kind: ErrorKind::CycleDetected,
            path: Some(path.into()),
            help: Some("Break the cycle by replacing one of the references with a value".into()),
            cause: Some(format!("Chain: {}", chain_str)),
        }
    }

    /// Create an I/O error
    pub fn io(location: impl Into<String>, message: impl Into<String>) -> Self {
        let loc = location.into();
        Self {
            kind: ErrorKind::Io,
            path: None,
            help: Some(format!("Check that '{}' exists and is readable", loc)),
            cause: Some(message.into()),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Internal,
            path: None,
            help: None,
            cause: Some(message.into()),
        }
    }

    /// Add path context to the error
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Add help message to the error
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Add an underlying diagnostic to the error
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::Format { format } => write!(f, "{} parsing failed", format.to_uppercase())?,
            ErrorKind::PathNotFound => write!(f, "Path not found")?,
            ErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "Expected {} but got {}", expected, actual)?
            }
            ErrorKind::ValidationFailed => write!(f, "Validation failed")?,
            ErrorKind::UnknownType { name } => write!(f, "Type '{}' is not registered", name)?,
            ErrorKind::UndefinedClass { name } => write!(f, "Class '{}' is not defined", name)?,
            ErrorKind::CycleDetected => write!(f, "Reference cycle detected")?,
            ErrorKind::Io => write!(f, "I/O error")?,
            ErrorKind::Internal => write!(f, "Internal error")?,
        }

        if let Some(path) = &self.path {
            write!(f, "\n  Path: {}", path)?;
        }

        if let Some(cause) = &self.cause {
            write!(f, "\n  {}", cause)?;
        }

        if let Some(help) = &self.help {
            write!(f, "\n  Help: {}", help)?;
        }

        Ok(())
    }
}

impl std::error::Error for Error {}
