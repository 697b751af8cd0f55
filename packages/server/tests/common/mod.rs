//! Helpers for running servers in-process during integration tests.

#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc};

use relaybox_server::{ConnectionAcceptor, ServerConfig, SessionHandler};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    sync::oneshot,
    task::JoinHandle,
};

/// A server bound to an ephemeral loopback port, stopped on drop
pub struct TestServer {
    pub addr: SocketAddr,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl TestServer {
    pub async fn start<H: SessionHandler>(handler: H) -> Self {
        Self::start_shared(Arc::new(handler)).await
    }

    /// Like [`TestServer::start`], keeping a handle on the handler's state
    pub async fn start_shared<H: SessionHandler>(handler: Arc<H>) -> Self {
        let acceptor = ConnectionAcceptor::bind(&ServerConfig::new("127.0.0.1", 0))
            .await
            .expect("Failed to bind test server");
        let addr = acceptor.local_addr().unwrap();
        let (stop, stopped) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            acceptor
                .run(handler, async move {
                    let _ = stopped.await;
                })
                .await
                .expect("Accept loop failed");
        });

        Self {
            addr,
            stop: Some(stop),
            task,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.task.abort();
    }
}

/// Line-oriented test client over a raw TCP connection
pub struct LineClient {
    pub reader: BufReader<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
    pub local_addr: SocketAddr,
}

impl LineClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("Failed to connect");
        let local_addr = stream.local_addr().unwrap();
        let (read_half, write_half) = stream.into_split();
        Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            local_addr,
        }
    }

    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("Failed to send line");
    }

    pub async fn read_line(&mut self) -> String {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .await
            .expect("Failed to read line");
        line
    }

    /// Lines up to and including the blank terminator (or EOF)
    pub async fn read_block(&mut self) -> String {
        let mut block = String::new();
        loop {
            let line = self.read_line().await;
            block.push_str(&line);
            if line == "\n" || line.is_empty() {
                return block;
            }
        }
    }
}
