//! Error handling for the ntdata-rs data engine
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.
//!
//! Errors are deliberately scarce here. Transport failures surface as a
//! connection-state transition, not as error values, and arrival-order
//! races (data before announce, remove after remove) degrade to no-ops
//! inside the sink. What remains is real I/O: config files and recorded
//! session documents.

use thiserror::Error;

/// Main error type for ntdata-rs operations
#[derive(Error, Debug)]
pub enum DataError {
    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to recorded session documents
    #[error("Recording error: {0}")]
    Recording(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<DataError>,
    },
}

impl DataError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        DataError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Result type alias for ntdata-rs operations
pub type Result<T> = std::result::Result<T, DataError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
