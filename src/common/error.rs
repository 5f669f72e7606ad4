//! Unified error types for the veles codebase.

use std::fmt;

/// Failure reported by the SQL engine for a single protocol message.
///
/// Carries the diagnostic text verbatim; it becomes the `M` field of the
/// ErrorResponse sent back to the client.
#[derive(Debug)]
pub struct EngineError {
    message: String,
}

impl EngineError {
    /// Create an engine error from a diagnostic string.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The diagnostic text as the engine reported it.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}
