//! Wire protocol shared by the chat and file servers and their clients.
//!
//! Both protocols are line-oriented UTF-8 with `\n` terminators. The only
//! binary payload is the file body that follows a [`Handshake`] and the
//! client's [`READY`] confirmation; its length is announced in the handshake
//! and nothing else delimits it.

use thiserror::Error;

/// Size of one unit of file data moved per read/write while streaming
pub const CHUNK_SIZE: usize = 4096;

/// Line terminator used by every text reply
pub const LINE_END: char = '\n';

/// Prefix of the handshake line sent before a file body
pub const SENDING_FILE_PREFIX: &str = "SENDING_FILE:";

/// Confirmation the client sends to start the file body
pub const READY: &str = "READY";

/// Start of the line sent instead of a body when the file cannot be read
pub const SEND_ERROR_PREFIX: &str = "Error sending file: ";

/// Chat command: reply with the connected client count
pub const CHAT_LIST: &str = "/list";

/// Chat command: leave the chat
pub const CHAT_QUIT: &str = "/quit";

/// File command keywords (matched case-insensitively)
pub const FILE_LIST: &str = "LIST";
pub const FILE_GET: &str = "GET";
pub const FILE_QUIT: &str = "QUIT";

/// Handshake parse errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HandshakeError {
    #[error("line is not a file handshake: {0:?}")]
    NotAHandshake(String),

    #[error("handshake is missing the file size: {0:?}")]
    MissingSize(String),

    #[error("invalid file size {size:?} in handshake")]
    InvalidSize { size: String },
}

/// `SENDING_FILE:<name>:<size>` line announcing a file body of `size` bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    pub name: String,
    pub size: u64,
}

impl Handshake {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }

    /// Encode as a full line, terminator included
    pub fn encode(&self) -> String {
        format!("{}{}:{}{}", SENDING_FILE_PREFIX, self.name, self.size, LINE_END)
    }

    /// Parse a received line (terminator optional).
    ///
    /// The size is taken after the last `:` so names containing colons survive.
    pub fn parse(line: &str) -> Result<Self, HandshakeError> {
        let line = line.trim_end_matches(['\r', '\n']);
        let rest = line
            .strip_prefix(SENDING_FILE_PREFIX)
            .ok_or_else(|| HandshakeError::NotAHandshake(line.to_string()))?;
        let (name, size) = rest
            .rsplit_once(':')
            .ok_or_else(|| HandshakeError::MissingSize(line.to_string()))?;
        let size = size
            .trim()
            .parse::<u64>()
            .map_err(|_| HandshakeError::InvalidSize {
                size: size.to_string(),
            })?;

        Ok(Self::new(name, size))
    }

    pub fn is_handshake(line: &str) -> bool {
        line.starts_with(SENDING_FILE_PREFIX)
    }
}
