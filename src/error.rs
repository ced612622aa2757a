//! Error types for dispatch-sweep
//!
//! This module defines the error types used throughout the library.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for dispatch-sweep operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while generating programs or sweeping tools
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid sweep or generation parameters
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Program synthesis produced a structurally invalid program
    #[error("generation error: {0}")]
    Generation(String),

    /// External tool could not be launched or waited on
    #[error("failed to launch {tool}: {message}")]
    Launch {
        /// Tool identifier
        tool: String,
        /// Underlying cause
        message: String,
    },

    /// External tool exceeded the configured timeout
    #[error("{tool} timed out on {test} after {secs}s")]
    Timeout {
        /// Tool identifier
        tool: String,
        /// Test identifier of the grid cell
        test: String,
        /// Timeout limit in seconds
        secs: u64,
    },

    /// Expected verification failure was not reported by the tool
    #[error("expected verification failure not found for {test} ({tool}: missing {marker:?}, see {})", .log.display())]
    MissingMarker {
        /// Tool identifier
        tool: String,
        /// Test identifier of the grid cell
        test: String,
        /// Marker that was searched for
        marker: String,
        /// Log file that was searched
        log: PathBuf,
    },

    /// Source revision lookup failed
    #[error("revision lookup failed: {0}")]
    Revision(String),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Results table error
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// Tool configuration (de)serialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}
