//! Chat relay client.

use relaybox_shared::protocol::CHAT_QUIT;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::mpsc,
};

use crate::{
    error::ClientError,
    ui::{CHAT_PROMPT, redisplay_prompt},
};

/// Run the chat client until `/quit`, Ctrl+C/Ctrl+D or the server closes.
pub async fn run_chat_client(addr: String) -> Result<(), ClientError> {
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;
    tracing::info!("Connected to chat server at {}", addr);
    println!("Type messages and press Enter to send. /quit or Ctrl+C to exit.\n");

    let (read_half, mut write_half) = stream.into_split();

    // Spawn a task to print incoming lines
    let mut read_task = tokio::spawn(async move {
        let mut lines = BufReader::new(read_half).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    println!("\r{}", line);
                    redisplay_prompt(CHAT_PROMPT);
                }
                Ok(None) => {
                    tracing::info!("Server closed the connection");
                    return Ok::<(), ClientError>(());
                }
                Err(e) => {
                    tracing::warn!("Read error: {}", e);
                    return Err(ClientError::Io(e));
                }
            }
        }
    });

    // rustyline blocks, so it runs on its own thread
    let (input_tx, mut input_rx) = mpsc::unbounded_channel::<String>();
    let _readline_handle = std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                eprintln!("Failed to initialize readline: {}", e);
                return;
            }
        };

        loop {
            match rl.readline(CHAT_PROMPT) {
                Ok(line) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(line).ok();
                    if input_tx.send(line.to_string()).is_err() || line == CHAT_QUIT {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                    // leave the chat cleanly
                    let _ = input_tx.send(CHAT_QUIT.to_string());
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    break;
                }
            }
        }
    });

    // Forward typed lines to the server
    let mut write_task = tokio::spawn(async move {
        while let Some(line) = input_rx.recv().await {
            write_half
                .write_all(format!("{}\n", line).as_bytes())
                .await?;
            if line == CHAT_QUIT {
                break;
            }
        }
        write_half.shutdown().await?;
        Ok::<(), ClientError>(())
    });

    // If any one of the tasks completes, abort the other
    tokio::select! {
        read_result = &mut read_task => {
            write_task.abort();
            read_result.map_err(|e| ClientError::Io(std::io::Error::other(e)))?
        }
        write_result = &mut write_task => {
            read_task.abort();
            write_result.map_err(|e| ClientError::Io(std::io::Error::other(e)))?
        }
    }
}
