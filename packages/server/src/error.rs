//! Error types for the Relaybox servers.

use std::io;

use thiserror::Error;

/// Server-wide errors. Only startup failures reach this level.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or listening on the configured address failed
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Shared directory lookup errors
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No regular file with that exact name in the shared directory
    #[error("File '{0}' not found")]
    NotFound(String),

    /// Name contains path separators or would resolve outside the shared directory
    #[error("Invalid file name '{0}'")]
    InvalidName(String),

    #[error("{0}")]
    Io(#[from] io::Error),
}

/// Errors that end one session. Caught at the session boundary.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("connection I/O error: {0}")]
    Io(#[from] io::Error),

    /// The file shrank after its size was announced
    #[error("file '{name}' ended after {sent} of {declared} announced bytes")]
    TruncatedFile {
        name: String,
        sent: u64,
        declared: u64,
    },
}
