//! Per-connection chat session.

use std::{net::SocketAddr, sync::Arc};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite};

use crate::error::SessionError;

use super::{
    broadcaster::Broadcaster,
    connection::{ClientConnection, LineSink},
    message::{ChatInput, ChatMessage, client_count_line, welcome_banner},
    registry::ClientRegistry,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChatState {
    Connected,
    Active,
    Closed,
}

/// Drives one chat connection from accept to close
pub struct ChatSession<R, W> {
    reader: R,
    connection: ClientConnection<W>,
    registry: Arc<ClientRegistry>,
    broadcaster: Broadcaster,
}

impl<R, W> ChatSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        reader: R,
        writer: W,
        peer: SocketAddr,
        registry: Arc<ClientRegistry>,
        broadcaster: Broadcaster,
    ) -> Self {
        Self {
            reader,
            connection: ClientConnection::new(peer, writer),
            registry,
            broadcaster,
        }
    }

    /// Run until the client quits, disconnects or fails.
    ///
    /// Errors end only this session; they are logged and never returned.
    pub async fn run(mut self) {
        let peer = self.connection.peer;
        tracing::info!("Chat client {} connected", peer);

        let mut state = ChatState::Connected;
        while state != ChatState::Closed {
            let step = match state {
                ChatState::Connected => self.enter().await.map(|()| ChatState::Active),
                ChatState::Active => self.serve_line().await,
                ChatState::Closed => Ok(ChatState::Closed),
            };
            state = step.unwrap_or_else(|e| {
                tracing::warn!("Error with chat client {}: {}", peer, e);
                ChatState::Closed
            });
        }

        self.close().await;
        tracing::info!("Chat client {} disconnected", peer);
    }

    async fn enter(&mut self) -> Result<(), SessionError> {
        let sink: Arc<dyn LineSink> = self.connection.sink.clone();
        self.registry.add(self.connection.id, sink).await;

        let connected = self.registry.len().await;
        self.connection.sink.send(&welcome_banner(connected)).await?;
        Ok(())
    }

    async fn serve_line(&mut self) -> Result<ChatState, SessionError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(ChatState::Closed);
        }

        match ChatInput::parse(&line) {
            ChatInput::Quit => Ok(ChatState::Closed),
            ChatInput::List => {
                let connected = self.registry.len().await;
                self.connection
                    .sink
                    .send(&client_count_line(connected))
                    .await?;
                Ok(ChatState::Active)
            }
            ChatInput::Empty => Ok(ChatState::Active),
            ChatInput::Text(text) => {
                let message = ChatMessage::new(self.connection.peer, text);
                tracing::debug!("Relaying message from {}: {}", message.sender, text);
                let report = self
                    .broadcaster
                    .broadcast(&message.to_line(), self.connection.id)
                    .await;
                tracing::debug!(
                    "Message from {} delivered to {} client(s)",
                    message.sender,
                    report.delivered
                );
                Ok(ChatState::Active)
            }
        }
    }

    async fn close(&mut self) {
        self.registry.remove(self.connection.id).await;
        if let Err(e) = self.connection.sink.shutdown().await {
            tracing::debug!(
                "Shutdown of chat connection {} failed: {}",
                self.connection.peer,
                e
            );
        }
    }
}
