//! Shared pieces of the Relaybox server and client.
//!
//! - `logger`: tracing subscriber setup used by every binary
//! - `protocol`: wire constants and the file-transfer handshake codec

pub mod logger;
pub mod protocol;
