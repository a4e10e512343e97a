//! Error handling module for expkit
//!
//! Provides centralized error types using thiserror. Mapping diagnostics are
//! logged rather than returned; these errors cover I/O, manifests and lookups.

use thiserror::Error;

/// Main error type for expkit
#[derive(Error, Debug)]
pub enum ExpkitError {
    /// IO errors (reading/writing experiment files, directory scans)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed experiments manifest or experiment file
    #[error("Manifest error: {0}")]
    Manifest(String),

    /// Lookup of a variable name that is not in the list
    #[error("Variable {0} not found")]
    VariableNotFound(String),

    /// Assignment of a value to a group variable
    #[error("Variable {0} is a group and holds no value")]
    GroupValue(String),

    /// Unknown built-in template
    #[error("Template error: {0}")]
    Template(String),
}

/// Result type alias for expkit operations
pub type Result<T> = std::result::Result<T, ExpkitError>;

impl ExpkitError {
    /// Create a manifest error
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest(msg.into())
    }

    /// Create a template error
    pub fn template(msg: impl Into<String>) -> Self {
        Self::Template(msg.into())
    }
}
