// src/error.rs

//! Unified error handling for the monitor.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for monitor operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid job definition or configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Target could not be fetched (network, timeout, error status)
    #[error("Fetch error for {target}: {message}")]
    Fetch { target: String, message: String },

    /// State store read or write failed
    #[error("Store error: {0}")]
    Store(String),

    /// Alert delivery failed
    #[error("Notify error: {0}")]
    Notify(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl AppError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a fetch error for a target.
    pub fn fetch(target: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            target: target.into(),
            message: message.to_string(),
        }
    }

    /// Create a store error.
    pub fn store(message: impl fmt::Display) -> Self {
        Self::Store(message.to_string())
    }

    /// Create a notify error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Job-scoped category used in run summaries.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Config(_) | Self::Toml(_) | Self::Regex(_) => ErrorKind::Config,
            Self::Fetch { .. } | Self::Http(_) => ErrorKind::Fetch,
            Self::Store(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Store,
            Self::Notify(_) => ErrorKind::Notify,
        }
    }
}

/// Category of a per-job failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Fetch,
    Store,
    Notify,
    /// The run timed out before the job finished
    Cancelled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Config => "config",
            Self::Fetch => "fetch",
            Self::Store => "store",
            Self::Notify => "notify",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
