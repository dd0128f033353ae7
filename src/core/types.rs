use serde::{Deserialize, Serialize};

/// Error category enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// Invocation parameters could not be turned into a step configuration.
    ConfigurationError,
    /// An expected storage artifact is missing.
    NotFoundError,
    /// Generated documentation no longer matches the fixed bundling pattern.
    ContentMismatchError,
    ValidationError,
    SerializationError,
    StorageError,
    IoError,
    InternalError,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Error severity enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorSeverity {
    /// Fails the step.
    Error,
    /// Reported but the step continues.
    Warning,
}
