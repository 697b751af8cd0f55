//! Interactive clients for the Relaybox chat relay and file server.

pub mod chat;
pub mod error;
pub mod files;
mod ui;

pub use chat::run_chat_client;
pub use error::ClientError;
pub use files::{FileClient, GetOutcome, run_file_client};
