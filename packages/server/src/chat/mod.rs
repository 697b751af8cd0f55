//! Broadcast chat relay.
//!
//! Every connection joins one process-wide [`ClientRegistry`]. Lines that are
//! not commands are prefixed with the sender's address and relayed to every
//! other registered connection.

mod broadcaster;
mod connection;
mod message;
mod registry;
mod session;

use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use tokio::{io::BufReader, net::TcpStream};

use crate::acceptor::SessionHandler;

pub use broadcaster::{BroadcastReport, Broadcaster};
pub use connection::{ConnectionId, LineSink, StreamSink};
pub use message::{ChatInput, ChatMessage};
pub use registry::ClientRegistry;
pub use session::ChatSession;

/// Chat server state shared by all chat sessions
pub struct ChatServer {
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
}

impl ChatServer {
    /// Create a chat server with an empty registry
    pub fn new() -> Self {
        let registry = Arc::new(ClientRegistry::new());
        let broadcaster = Broadcaster::new(registry.clone());
        Self {
            registry,
            broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }
}

impl Default for ChatServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionHandler for ChatServer {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr) {
        let (read_half, write_half) = stream.into_split();
        ChatSession::new(
            BufReader::new(read_half),
            write_half,
            peer,
            self.registry.clone(),
            self.broadcaster.clone(),
        )
        .run()
        .await;
    }
}
