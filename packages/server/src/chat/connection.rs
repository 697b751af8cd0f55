//! Client connection identity and the write side of a chat connection.

use std::{fmt, io, net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::Mutex,
};
use uuid::Uuid;

/// Identity of one accepted connection.
///
/// Registry membership is keyed by this, never by the peer address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something a chat session or a broadcast can write text to
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LineSink: Send + Sync {
    /// Write `text` in full, exactly as given.
    async fn send(&self, text: &str) -> io::Result<()>;
}

/// [`LineSink`] over the write half of a stream.
///
/// The mutex keeps a session's own replies and other sessions' broadcasts
/// from interleaving inside one line.
pub struct StreamSink<W> {
    writer: Mutex<W>,
}

impl<W> StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Flush and shut down the write side.
    pub async fn shutdown(&self) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.shutdown().await
    }
}

#[async_trait]
impl<W> LineSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, text: &str) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await
    }
}

/// A live chat connection as seen by its own session
pub struct ClientConnection<W> {
    pub id: ConnectionId,
    pub peer: SocketAddr,
    pub sink: Arc<StreamSink<W>>,
}

impl<W> ClientConnection<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(peer: SocketAddr, writer: W) -> Self {
        Self {
            id: ConnectionId::generate(),
            peer,
            sink: Arc::new(StreamSink::new(writer)),
        }
    }
}
