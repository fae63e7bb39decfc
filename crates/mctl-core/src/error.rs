//! Core error types for menuctl

use std::path::PathBuf;
use thiserror::Error;

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file not found
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// Invalid configuration
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialize error
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Known-hosts store errors
#[derive(Error, Debug)]
pub enum TrustStoreError {
    /// Reading the store failed
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Appending a new entry failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors from parsing user-entered PID lists
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PidListError {
    /// Nothing but separators was entered
    #[error("no PID specified")]
    Empty,

    /// A token was not a decimal process id
    #[error("'{0}' is not a valid PID")]
    InvalidPid(String),
}
