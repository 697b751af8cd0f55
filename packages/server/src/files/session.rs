//! Per-connection file transfer session.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use relaybox_shared::protocol::{CHUNK_SIZE, Handshake, READY, SEND_ERROR_PREFIX};
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt},
};

use crate::error::{CatalogError, SessionError};

use super::{
    catalog::{CatalogEntry, FileCatalog, ResolvedFile},
    command::FileCommand,
};

pub const MENU_BANNER: &str = "=== File Transfer Server ===\n\
                               Available commands:\n\
                               \x20 LIST - List available files\n\
                               \x20 GET <filename> - Download a file\n\
                               \x20 QUIT - Disconnect\n\n";

const UNRECOGNIZED_COMMAND: &str = "Unrecognized command. Use LIST, GET <filename>, or QUIT\n";

/// State of one `GET` from handshake to the end of the body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransferSession {
    pub name: String,
    pub path: PathBuf,
    /// Size announced in the handshake; never exceeded on the wire
    pub declared_size: u64,
    pub bytes_sent: u64,
}

impl From<ResolvedFile> for FileTransferSession {
    fn from(file: ResolvedFile) -> Self {
        Self {
            name: file.name,
            path: file.path,
            declared_size: file.size,
            bytes_sent: 0,
        }
    }
}

#[derive(Debug)]
enum FileState {
    WaitingCommand,
    Listing,
    Sending(FileTransferSession),
    Closed,
}

/// Drives one file-server connection from accept to close
pub struct FileSession<R, W> {
    reader: R,
    writer: W,
    peer: SocketAddr,
    catalog: Arc<FileCatalog>,
}

impl<R, W> FileSession<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W, peer: SocketAddr, catalog: Arc<FileCatalog>) -> Self {
        Self {
            reader,
            writer,
            peer,
            catalog,
        }
    }

    /// Serve commands until `QUIT`, disconnect or an I/O failure.
    pub async fn run(mut self) {
        tracing::info!("File client {} connected", self.peer);

        let mut state = match self.write_text(MENU_BANNER).await {
            Ok(()) => FileState::WaitingCommand,
            Err(e) => {
                tracing::warn!("Error with file client {}: {}", self.peer, e);
                FileState::Closed
            }
        };

        loop {
            let step = match state {
                FileState::WaitingCommand => self.wait_command().await,
                FileState::Listing => self.send_listing().await,
                FileState::Sending(transfer) => self.send_file(transfer).await,
                FileState::Closed => break,
            };
            state = step.unwrap_or_else(|e| {
                tracing::warn!("Error with file client {}: {}", self.peer, e);
                FileState::Closed
            });
        }

        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!("Shutdown of file connection {} failed: {}", self.peer, e);
        }
        tracing::info!("File client {} disconnected", self.peer);
    }

    async fn wait_command(&mut self) -> Result<FileState, SessionError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Ok(FileState::Closed);
        }

        match FileCommand::parse(&line) {
            FileCommand::Quit => Ok(FileState::Closed),
            FileCommand::List => Ok(FileState::Listing),
            FileCommand::Get(name) => self.start_transfer(name).await,
            FileCommand::Unknown(command) => {
                tracing::debug!("Unrecognized command from {}: {:?}", self.peer, command);
                self.write_text(UNRECOGNIZED_COMMAND).await?;
                Ok(FileState::WaitingCommand)
            }
        }
    }

    async fn send_listing(&mut self) -> Result<FileState, SessionError> {
        let response = match self.catalog.list().await {
            Ok(entries) => render_listing(&entries),
            Err(e) => {
                tracing::warn!("Listing {} failed: {}", self.catalog.root().display(), e);
                format!("Error listing files: {}\n", e)
            }
        };
        self.write_text(&response).await?;
        Ok(FileState::WaitingCommand)
    }

    async fn start_transfer(&mut self, name: &str) -> Result<FileState, SessionError> {
        match self.catalog.resolve(name).await {
            Ok(file) => {
                let handshake = Handshake::new(file.name.as_str(), file.size);
                self.write_text(&handshake.encode()).await?;
                Ok(FileState::Sending(file.into()))
            }
            Err(e @ (CatalogError::NotFound(_) | CatalogError::InvalidName(_))) => {
                tracing::debug!("GET {:?} from {} refused: {}", name, self.peer, e);
                self.write_text(&format!("{}\n", e)).await?;
                Ok(FileState::WaitingCommand)
            }
            Err(CatalogError::Io(e)) => {
                tracing::warn!("GET {:?} from {} failed: {}", name, self.peer, e);
                self.write_text(&format!("{}{}\n", SEND_ERROR_PREFIX, e))
                    .await?;
                Ok(FileState::WaitingCommand)
            }
        }
    }

    async fn send_file(
        &mut self,
        mut transfer: FileTransferSession,
    ) -> Result<FileState, SessionError> {
        let mut confirmation = String::new();
        let read = self.reader.read_line(&mut confirmation).await?;
        if read == 0 || confirmation.trim() != READY {
            tracing::debug!(
                "Transfer of '{}' to {} abandoned (confirmation {:?})",
                transfer.name,
                self.peer,
                confirmation.trim()
            );
            return Ok(FileState::WaitingCommand);
        }

        let file = match File::open(&transfer.path).await {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Opening '{}' failed: {}", transfer.path.display(), e);
                self.write_text(&format!("{}{}\n", SEND_ERROR_PREFIX, e))
                    .await?;
                return Ok(FileState::WaitingCommand);
            }
        };

        let mut body = file.take(transfer.declared_size);
        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = body.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            self.writer.write_all(&chunk[..n]).await?;
            transfer.bytes_sent += n as u64;
        }
        self.writer.flush().await?;

        if transfer.bytes_sent < transfer.declared_size {
            return Err(SessionError::TruncatedFile {
                name: transfer.name,
                sent: transfer.bytes_sent,
                declared: transfer.declared_size,
            });
        }

        tracing::info!(
            "File '{}' sent to {} ({} bytes)",
            transfer.name,
            self.peer,
            transfer.bytes_sent
        );
        Ok(FileState::WaitingCommand)
    }

    async fn write_text(&mut self, text: &str) -> Result<(), SessionError> {
        self.writer.write_all(text.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

/// Numbered listing terminated by a blank line
pub fn render_listing(entries: &[CatalogEntry]) -> String {
    if entries.is_empty() {
        return "No files available\n\n".to_string();
    }

    let mut response = String::from("Available files:\n");
    for (index, entry) in entries.iter().enumerate() {
        response.push_str(&format!(
            "  {}. {} ({} bytes)\n",
            index + 1,
            entry.name,
            entry.size
        ));
    }
    response.push('\n');
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio::io::{BufReader, DuplexStream, duplex};

    struct Client {
        stream: BufReader<DuplexStream>,
        task: tokio::task::JoinHandle<()>,
        dir: TempDir,
    }

    impl Client {
        /// Start a session over a fresh shared directory holding `files`
        async fn connect(files: &[(&str, Vec<u8>)]) -> Self {
            let dir = tempfile::tempdir().unwrap();
            for (name, contents) in files {
                std::fs::write(dir.path().join(name), contents).unwrap();
            }
            let catalog = Arc::new(FileCatalog::new(dir.path()));

            let (client, server) = duplex(64 * 1024);
            let (read_half, write_half) = tokio::io::split(server);
            let session = FileSession::new(
                BufReader::new(read_half),
                write_half,
                "127.0.0.1:40000".parse().unwrap(),
                catalog,
            );
            let task = tokio::spawn(session.run());

            let mut client = Self {
                stream: BufReader::new(client),
                task,
                dir,
            };
            assert_eq!(client.read_block().await, MENU_BANNER);
            client
        }

        async fn send(&mut self, line: &str) {
            self.stream
                .get_mut()
                .write_all(format!("{}\n", line).as_bytes())
                .await
                .unwrap();
        }

        async fn read_line(&mut self) -> String {
            let mut line = String::new();
            self.stream.read_line(&mut line).await.unwrap();
            line
        }

        /// Lines up to and including the blank terminator
        async fn read_block(&mut self) -> String {
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

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn test_render_listing() {
        let entries = vec![
            CatalogEntry {
                name: "a.txt".to_string(),
                size: 5,
            },
            CatalogEntry {
                name: "b.bin".to_string(),
                size: 0,
            },
        ];

        assert_eq!(
            render_listing(&entries),
            "Available files:\n  1. a.txt (5 bytes)\n  2. b.bin (0 bytes)\n\n"
        );
        assert_eq!(render_listing(&[]), "No files available\n\n");
    }

    #[tokio::test]
    async fn test_list_on_empty_directory() {
        let mut client = Client::connect(&[]).await;

        client.send("LIST").await;

        assert_eq!(client.read_block().await, "No files available\n\n");
    }

    #[tokio::test]
    async fn test_list_reports_actual_size() {
        let mut client = Client::connect(&[("data.bin", pattern(12_345))]).await;

        client.send("list").await;

        assert_eq!(
            client.read_block().await,
            "Available files:\n  1. data.bin (12345 bytes)\n\n"
        );
    }

    #[tokio::test]
    async fn test_get_missing_file_keeps_session_alive() {
        // given (前提条件):
        let mut client = Client::connect(&[("a.txt", b"abc".to_vec())]).await;

        // when (操作):
        client.send("GET nope.txt").await;

        // then (期待する結果):
        assert_eq!(client.read_line().await, "File 'nope.txt' not found\n");
        client.send("LIST").await;
        assert_eq!(
            client.read_block().await,
            "Available files:\n  1. a.txt (3 bytes)\n\n"
        );
    }

    #[tokio::test]
    async fn test_get_traversal_is_refused() {
        let mut client = Client::connect(&[]).await;

        client.send("GET ../../etc/passwd").await;

        assert_eq!(
            client.read_line().await,
            "Invalid file name '../../etc/passwd'\n"
        );
    }

    #[tokio::test]
    async fn test_get_streams_exact_bytes_after_ready() {
        // given (前提条件): larger than several chunks and not a multiple of one
        let contents = pattern(3 * CHUNK_SIZE + 123);
        let mut client = Client::connect(&[("blob.bin", contents.clone())]).await;

        // when (操作):
        client.send("GET blob.bin").await;
        let handshake = Handshake::parse(&client.read_line().await).unwrap();
        client.send(READY).await;
        let mut received = vec![0u8; handshake.size as usize];
        client.stream.read_exact(&mut received).await.unwrap();

        // then (期待する結果):
        assert_eq!(handshake, Handshake::new("blob.bin", contents.len() as u64));
        assert_eq!(received, contents);

        // no trailer: the next bytes answer the next command
        client.send("LIST").await;
        assert_eq!(client.read_line().await, "Available files:\n");
    }

    #[tokio::test]
    async fn test_file_shrunk_after_handshake_closes_session() {
        // given (前提条件): 10000 bytes announced
        let mut client = Client::connect(&[("log.bin", pattern(10_000))]).await;
        client.send("GET log.bin").await;
        assert_eq!(client.read_line().await, "SENDING_FILE:log.bin:10000\n");

        // when (操作): the file is cut down before READY arrives
        std::fs::write(client.dir.path().join("log.bin"), pattern(100)).unwrap();
        client.send(READY).await;

        // then (期待する結果): the shorter body, then the session ends
        let mut received = Vec::new();
        client.stream.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, pattern(100));
        (&mut client.task).await.unwrap();
    }

    #[tokio::test]
    async fn test_file_grown_after_handshake_is_capped_at_declared_size() {
        // given (前提条件): 100 bytes announced
        let mut client = Client::connect(&[("log.bin", pattern(100))]).await;
        client.send("GET log.bin").await;
        assert_eq!(client.read_line().await, "SENDING_FILE:log.bin:100\n");

        // when (操作): the file grows before READY arrives
        let grown: Vec<u8> = (0..5_000).map(|i| (i % 7) as u8 + b'a').collect();
        std::fs::write(client.dir.path().join("log.bin"), &grown).unwrap();
        client.send(READY).await;
        let mut received = vec![0u8; 100];
        client.stream.read_exact(&mut received).await.unwrap();

        // then (期待する結果): exactly the announced bytes, then the next reply
        assert_eq!(received, grown[..100]);
        client.send("BOGUS").await;
        assert_eq!(client.read_line().await, UNRECOGNIZED_COMMAND);
    }

    #[tokio::test]
    async fn test_file_deleted_after_handshake_reports_error() {
        // given (前提条件):
        let mut client = Client::connect(&[("gone.txt", b"soon gone".to_vec())]).await;
        client.send("GET gone.txt").await;
        assert_eq!(client.read_line().await, "SENDING_FILE:gone.txt:9\n");

        // when (操作):
        std::fs::remove_file(client.dir.path().join("gone.txt")).unwrap();
        client.send(READY).await;

        // then (期待する結果): an error line instead of a body, session still open
        assert!(client.read_line().await.starts_with(SEND_ERROR_PREFIX));
        client.send("LIST").await;
        assert_eq!(client.read_block().await, "No files available\n\n");
    }

    #[tokio::test]
    async fn test_get_empty_file() {
        let mut client = Client::connect(&[("empty.txt", Vec::new())]).await;

        client.send("GET empty.txt").await;
        assert_eq!(client.read_line().await, "SENDING_FILE:empty.txt:0\n");
        client.send(READY).await;
        client.send("BOGUS").await;

        assert_eq!(client.read_line().await, UNRECOGNIZED_COMMAND);
    }

    #[tokio::test]
    async fn test_non_ready_confirmation_abandons_transfer() {
        // given (前提条件):
        let mut client = Client::connect(&[("a.txt", b"secret".to_vec())]).await;
        client.send("GET a.txt").await;
        assert_eq!(client.read_line().await, "SENDING_FILE:a.txt:6\n");

        // when (操作):
        client.send("NOPE").await;

        // then (期待する結果): no body, the session answers the next command
        client.send("LIST").await;
        assert_eq!(client.read_line().await, "Available files:\n");
    }

    #[tokio::test]
    async fn test_unknown_command_and_bare_get() {
        let mut client = Client::connect(&[]).await;

        client.send("DELETE a.txt").await;
        assert_eq!(client.read_line().await, UNRECOGNIZED_COMMAND);
        client.send("GET").await;
        assert_eq!(client.read_line().await, UNRECOGNIZED_COMMAND);
    }

    #[tokio::test]
    async fn test_quit_closes_session() {
        let mut client = Client::connect(&[]).await;

        client.send("quit").await;
        (&mut client.task).await.unwrap();

        assert_eq!(client.read_line().await, "");
    }

    #[tokio::test]
    async fn test_listing_failure_is_reported_to_client() {
        // given (前提条件):
        let mut client = Client::connect(&[]).await;
        let root = client.dir.path().to_path_buf();

        // when (操作): the shared directory disappears after startup
        std::fs::remove_dir_all(&root).unwrap();
        client.send("LIST").await;

        // then (期待する結果):
        assert!(client.read_line().await.starts_with("Error listing files: "));
        client.send("QUIT").await;
    }
}
