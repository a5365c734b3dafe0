//! Error types for the FPF engine.

use thiserror::Error;

/// Errors that can occur while computing conflict metrics.
///
/// Only [`FpfError::Configuration`] is fatal to a batch. Polygon failures are
/// contained to the aircraft that produced them, and row failures to the row.
#[derive(Debug, Error)]
pub enum FpfError {
    /// Invalid batch or geometry configuration (rejected before any bucket runs)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A velocity obstacle or clip result the boolean-ops sweep cannot handle
    #[error("Malformed polygon: {0}")]
    MalformedPolygon(String),

    /// A traffic row that cannot be turned into an aircraft state
    #[error("Invalid traffic row: {0}")]
    InvalidRow(String),

    /// Reading or writing a configuration file failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl FpfError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a malformed polygon error.
    pub fn polygon(msg: impl Into<String>) -> Self {
        Self::MalformedPolygon(msg.into())
    }
}

impl From<std::io::Error> for FpfError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for FpfError {
    fn from(e: serde_json::Error) -> Self {
        Self::Configuration(format!("invalid JSON: {}", e))
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, FpfError>;
