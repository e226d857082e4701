//! Error types for the stashd system

use std::io;
use thiserror::Error;

/// Main error type for the stashd system
#[derive(Error, Debug)]
pub enum StashError {
    /// Configuration file, parse, mapping or validation failure
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging sink errors
    #[error("Logging error: {0}")]
    Logging(String),
}

/// Result type alias for stashd operations
pub type Result<T> = std::result::Result<T, StashError>;

/// Configuration specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No path was given for the configuration file
    #[error("Configuration path is empty")]
    EmptyPath,

    /// The file or one of its parent directories could not be created
    #[error("Cannot create configuration file {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Default content could not be written
    #[error("Cannot write configuration file {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The file exists but could not be read
    #[error("Cannot read configuration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    /// Parse error
    #[error("Configuration parse error at line {line}: {message}")]
    ParseError { line: usize, message: String },

    /// A raw value could not be coerced to the field type
    #[error("Invalid configuration value for {field}: {value:?} (expected {expected})")]
    InvalidValue {
        field: String,
        value: String,
        expected: &'static str,
    },

    /// Validation error
    #[error("Configuration validation error: {field}: {message}")]
    ValidationError { field: String, message: String },
}

/// Filesystem specific errors
#[derive(Error, Debug)]
pub enum FsError {
    /// Path does not exist
    #[error("Path not found: {path}")]
    NotFound { path: String },

    /// Local I/O failure
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The remote backend reported a failure
    #[error("Remote error on {target}: {message}")]
    Remote { target: String, message: String },

    /// No bind point covers the requested path
    #[error("No bind point for path: {path}")]
    NoBindPoint { path: String },

    /// Bind entry is not of the form `local:remote`
    #[error("Invalid bind entry: {entry}")]
    InvalidBindEntry { entry: String },
}
