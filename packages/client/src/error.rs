//! Error types for the Relaybox clients.

use std::io;

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Connection or local file I/O error
    #[error("Connection error: {0}")]
    Io(#[from] io::Error),

    /// The server closed the connection in the middle of an exchange
    #[error("Server closed the connection")]
    ConnectionClosed,

    /// The server sent something the client cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The connection ended before the announced number of bytes arrived
    #[error("Transfer of '{name}' truncated: received {received} of {expected} bytes")]
    TruncatedTransfer {
        name: String,
        expected: u64,
        received: u64,
    },

    #[error("Readline error: {0}")]
    Readline(#[from] rustyline::error::ReadlineError),
}
