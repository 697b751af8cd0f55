//! Listening socket and accept loop shared by the chat and file servers.

use std::{future::Future, net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio::net::{TcpListener, TcpSocket, TcpStream};

use crate::{config::ServerConfig, error::ServerError};

/// Pause after a failed accept so a persistent error (e.g. EMFILE) does not spin
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Per-connection protocol run by the acceptor.
///
/// Implementations own every failure of the session; nothing propagates back
/// to the accept loop.
#[async_trait]
pub trait SessionHandler: Send + Sync + 'static {
    async fn handle(&self, stream: TcpStream, peer: SocketAddr);
}

/// Owns the listening socket and spawns one task per accepted connection
pub struct ConnectionAcceptor {
    listener: TcpListener,
}

impl ConnectionAcceptor {
    /// Bind with `SO_REUSEADDR` and listen with the configured backlog.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be resolved, bound
    /// or listened on. This is fatal for the server.
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let bind_addr = config.bind_addr();
        let bind_error = |source| ServerError::Bind {
            addr: bind_addr.clone(),
            source,
        };

        let addr = tokio::net::lookup_host(&bind_addr)
            .await
            .map_err(bind_error)?
            .next()
            .ok_or_else(|| {
                bind_error(std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    "address resolved to nothing",
                ))
            })?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()
        } else {
            TcpSocket::new_v6()
        }
        .map_err(bind_error)?;
        socket.set_reuseaddr(true).map_err(bind_error)?;
        socket.bind(addr).map_err(bind_error)?;
        let listener = socket.listen(config.backlog).map_err(bind_error)?;

        tracing::debug!(
            "Listening on {} with backlog {}",
            listener.local_addr()?,
            config.backlog
        );
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Accept failures are logged and the loop continues. Sessions still
    /// running when the loop ends are left to finish on their own.
    pub async fn run<H, F>(self, handler: Arc<H>, shutdown: F) -> Result<(), ServerError>
    where
        H: SessionHandler,
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Accept loop stopped");
                    break;
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        tracing::debug!("Accepted connection from {}", peer);
                        let handler = Arc::clone(&handler);
                        tokio::spawn(async move {
                            handler.handle(stream, peer).await;
                        });
                    }
                    Err(e) => {
                        tracing::error!("Failed to accept connection: {}", e);
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        sync::oneshot,
    };

    /// Writes the peer port back and closes
    struct PortEcho;

    #[async_trait]
    impl SessionHandler for PortEcho {
        async fn handle(&self, mut stream: TcpStream, peer: SocketAddr) {
            let _ = stream
                .write_all(format!("{}\n", peer.port()).as_bytes())
                .await;
        }
    }

    fn loopback() -> ServerConfig {
        ServerConfig::new("127.0.0.1", 0)
    }

    #[tokio::test]
    async fn test_spawns_one_session_per_connection() {
        // given (前提条件):
        let acceptor = ConnectionAcceptor::bind(&loopback()).await.unwrap();
        let addr = acceptor.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let server = tokio::spawn(acceptor.run(Arc::new(PortEcho), async move {
            let _ = stop_rx.await;
        }));

        // when (操作):
        let mut first = TcpStream::connect(addr).await.unwrap();
        let mut second = TcpStream::connect(addr).await.unwrap();

        // then (期待する結果):
        for stream in [&mut first, &mut second] {
            let own_port = stream.local_addr().unwrap().port();
            let mut reply = String::new();
            stream.read_to_string(&mut reply).await.unwrap();
            assert_eq!(reply, format!("{}\n", own_port));
        }

        stop_tx.send(()).unwrap();
        assert!(server.await.unwrap().is_ok());
    }

    #[tokio::test]
    async fn test_bind_conflict_is_fatal() {
        // given (前提条件):
        let first = ConnectionAcceptor::bind(&loopback()).await.unwrap();
        let port = first.local_addr().unwrap().port();

        // when (操作):
        let second = ConnectionAcceptor::bind(&ServerConfig::new("127.0.0.1", port)).await;

        // then (期待する結果):
        assert!(matches!(second, Err(ServerError::Bind { .. })));
    }

    #[tokio::test]
    async fn test_unresolvable_host_is_bind_error() {
        let result = ConnectionAcceptor::bind(&ServerConfig::new("no such host", 0)).await;

        assert!(matches!(result, Err(ServerError::Bind { .. })));
    }
}
