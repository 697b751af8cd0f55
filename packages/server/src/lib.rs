//! Relaybox servers: a broadcast chat relay and a file-listing/download server.
//!
//! Both servers share one [`ConnectionAcceptor`] that spawns a tokio task per
//! accepted connection and hands it to a [`SessionHandler`].

pub mod acceptor;
pub mod chat;
pub mod config;
pub mod error;
pub mod files;
pub mod signal;

pub use acceptor::{ConnectionAcceptor, SessionHandler};
pub use chat::ChatServer;
pub use config::{FileServerConfig, ServerConfig};
pub use error::{CatalogError, ServerError, SessionError};
pub use files::FileServer;
