//! Error types for the KMZ processing library.
//!
//! This module defines all error types that can occur while loading a network
//! document, loading a template, processing and exporting output.

use crate::pipeline::OutputKind;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur during document and template processing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Upload has the wrong file extension for its slot
    #[error("Invalid file format: expected a .{expected} file, got '{file_name}'")]
    Format {
        /// Extension the slot accepts (without the dot)
        expected: &'static str,
        /// Name of the rejected file
        file_name: String,
    },

    /// Container or markup could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Template schema or field mapping is unusable for the requested step
    #[error("Schema error: {0}")]
    Schema(String),

    /// A process step ran before its inputs were loaded
    #[error("Missing input: {0} has not been loaded")]
    MissingInput(&'static str),

    /// Export requested for an output without rows
    #[error("No processed {0} rows to export")]
    EmptyOutput(OutputKind),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Mapping file could not be read as JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a decode error from any displayable cause.
    pub(crate) fn decode(context: &str, cause: impl std::fmt::Display) -> Self {
        Error::Decode(format!("{}: {}", context, cause))
    }
}
