//! File transfer client.
//!
//! Commands are request/response over one connection. A download reads the
//! `SENDING_FILE:<name>:<size>` handshake, confirms with `READY` and then
//! reads exactly `<size>` raw bytes; the announced size is the only framing.

use std::{
    cmp,
    path::{Path, PathBuf},
};

use relaybox_shared::protocol::{
    CHUNK_SIZE, FILE_GET, FILE_LIST, FILE_QUIT, Handshake, READY, SEND_ERROR_PREFIX,
};
use rustyline::error::ReadlineError;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
};

use crate::{
    error::ClientError,
    ui::{FILE_PROMPT, Prompter, show_progress},
};

/// Result of a `GET`
#[derive(Debug, PartialEq, Eq)]
pub enum GetOutcome {
    /// The whole body arrived and was written to `path`
    Downloaded { path: PathBuf, size: u64 },
    /// The server answered with an error line instead of a handshake
    Rejected(String),
}

/// Connection to a file server
pub struct FileClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    menu: String,
}

impl FileClient {
    /// Connect and read the server's menu banner
    pub async fn connect(addr: &str) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|source| ClientError::Connect {
                addr: addr.to_string(),
                source,
            })?;
        let (read_half, write_half) = stream.into_split();

        let mut client = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            menu: String::new(),
        };
        client.menu = client.read_block().await?;
        Ok(client)
    }

    pub fn menu(&self) -> &str {
        &self.menu
    }

    /// `LIST`: the server's listing text, or its error line
    pub async fn list(&mut self) -> Result<String, ClientError> {
        self.send_line(FILE_LIST).await?;

        let first = self.read_line().await?;
        if first.starts_with("Error") {
            return Ok(first);
        }
        let mut listing = first;
        if listing != "\n" {
            listing.push_str(&self.read_block().await?);
        }
        Ok(listing)
    }

    /// `GET <name>`, saving the body under `download_dir`.
    ///
    /// `progress` is called with `(received, total)` after every chunk.
    ///
    /// If the server cannot open the file after `READY` it sends an
    /// `Error sending file: ...` line instead of the body. The body has no
    /// delimiter, so that line is recognised by its prefix: a complete line
    /// with that prefix at the start of the body, shorter or longer than the
    /// announced size, is returned as [`GetOutcome::Rejected`]. A file whose
    /// whole content is exactly such a line is still downloaded.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::TruncatedTransfer`] if the connection ends before
    /// the announced size arrived; the partial file is removed.
    pub async fn get(
        &mut self,
        name: &str,
        download_dir: &Path,
        mut progress: impl FnMut(u64, u64) + Send,
    ) -> Result<GetOutcome, ClientError> {
        self.send_line(&format!("{} {}", FILE_GET, name)).await?;

        let reply = self.read_line().await?;
        if !Handshake::is_handshake(&reply) {
            return Ok(GetOutcome::Rejected(reply.trim_end().to_string()));
        }
        let handshake =
            Handshake::parse(&reply).map_err(|e| ClientError::Protocol(e.to_string()))?;
        let file_name = Path::new(&handshake.name)
            .file_name()
            .ok_or_else(|| {
                ClientError::Protocol(format!("unusable file name {:?}", handshake.name))
            })?
            .to_owned();

        tracing::info!(
            "Downloading '{}' ({} bytes)...",
            handshake.name,
            handshake.size
        );
        tokio::fs::create_dir_all(download_dir).await?;
        let path = download_dir.join(file_name);
        let mut file = File::create(&path).await?;
        self.send_line(READY).await?;

        let result = match self.read_send_error(handshake.size).await {
            Ok(Some(reply)) => Ok(GetOutcome::Rejected(reply)),
            Ok(None) => self
                .receive_body(&mut file, &handshake, &mut progress)
                .await
                .map(|()| GetOutcome::Downloaded {
                    path: path.clone(),
                    size: handshake.size,
                }),
            Err(e) => Err(e),
        };

        match result {
            Ok(outcome @ GetOutcome::Downloaded { .. }) => {
                file.flush().await?;
                Ok(outcome)
            }
            other => {
                drop(file);
                if let Err(remove_error) = tokio::fs::remove_file(&path).await {
                    tracing::debug!(
                        "Could not remove partial file {}: {}",
                        path.display(),
                        remove_error
                    );
                }
                other
            }
        }
    }

    /// Consume the server's send error line if one stands in for the body
    async fn read_send_error(&mut self, declared: u64) -> Result<Option<String>, ClientError> {
        let buffered = self.reader.fill_buf().await?;
        if !buffered.starts_with(SEND_ERROR_PREFIX.as_bytes()) {
            return Ok(None);
        }
        let Some(line_len) = buffered.iter().position(|b| *b == b'\n').map(|i| i + 1) else {
            return Ok(None);
        };
        if line_len as u64 == declared {
            return Ok(None);
        }

        let line = self.read_line().await?;
        Ok(Some(line.trim_end().to_string()))
    }

    async fn receive_body(
        &mut self,
        file: &mut File,
        handshake: &Handshake,
        progress: &mut (impl FnMut(u64, u64) + Send),
    ) -> Result<(), ClientError> {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let mut received = 0u64;

        while received < handshake.size {
            let wanted = cmp::min(CHUNK_SIZE as u64, handshake.size - received) as usize;
            let n = self.reader.read(&mut chunk[..wanted]).await?;
            if n == 0 {
                return Err(ClientError::TruncatedTransfer {
                    name: handshake.name.clone(),
                    expected: handshake.size,
                    received,
                });
            }
            file.write_all(&chunk[..n]).await?;
            received += n as u64;
            progress(received, handshake.size);
        }

        Ok(())
    }

    /// Send any other command and return the server's one-line reply
    pub async fn command(&mut self, command: &str) -> Result<String, ClientError> {
        self.send_line(command).await?;
        self.read_line().await
    }

    /// `QUIT` and close the connection
    pub async fn quit(mut self) -> Result<(), ClientError> {
        self.send_line(FILE_QUIT).await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        let mut line = String::new();
        if self.reader.read_line(&mut line).await? == 0 {
            return Err(ClientError::ConnectionClosed);
        }
        Ok(line)
    }

    /// Lines up to and including the blank terminator
    async fn read_block(&mut self) -> Result<String, ClientError> {
        let mut block = String::new();
        loop {
            let line = self.read_line().await?;
            block.push_str(&line);
            if line == "\n" {
                return Ok(block);
            }
        }
    }
}

/// Interactive file client: prompt for commands until `QUIT` or Ctrl+C/Ctrl+D.
pub async fn run_file_client(addr: String, download_dir: PathBuf) -> Result<(), ClientError> {
    let mut client = FileClient::connect(&addr).await?;
    tracing::info!("Connected to file server at {}", addr);
    print!("{}", client.menu());

    let mut prompter = Prompter::spawn(FILE_PROMPT);
    loop {
        let line = match prompter.next_line().await {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                client.quit().await?;
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };
        let command = line.trim();
        if command.is_empty() {
            continue;
        }

        let upper = command.to_ascii_uppercase();
        if upper == FILE_QUIT {
            client.quit().await?;
            return Ok(());
        } else if upper == FILE_LIST {
            print!("{}", client.list().await?);
        } else if let Some(name) = command
            .get(..FILE_GET.len() + 1)
            .filter(|prefix| prefix.eq_ignore_ascii_case("GET "))
            .map(|_| command[FILE_GET.len() + 1..].trim())
        {
            match client.get(name, &download_dir, show_progress).await {
                Ok(GetOutcome::Downloaded { path, size }) => {
                    println!("\nFile downloaded: {} ({} bytes)", path.display(), size);
                }
                Ok(GetOutcome::Rejected(reply)) => println!("{}", reply),
                Err(e @ ClientError::TruncatedTransfer { .. }) => {
                    println!();
                    tracing::error!("{}", e);
                }
                Err(e) => return Err(e),
            }
        } else {
            print!("{}", client.command(command).await?);
        }
    }
}
